// Copyright 2022 Singularity Data
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The schema-catalog collaborator (spec §6): class definitions, attribute
//! metadata, statistics, and heap/index identifiers. This crate only ever
//! reads through [`SchemaCatalog`]; it never mutates or caches beyond one
//! optimization (§5).

use crate::parse_tree::ClassRef;

pub type HeapId = u64;
pub type AttrId = u32;

/// A b-tree index identifier: volume + file + root page, as spec.md's
/// GLOSSARY defines BTID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Btid {
    pub volid: i16,
    pub fileid: i32,
    pub root_pageid: i32,
}

#[derive(Debug, Clone)]
pub struct AttributeInfo {
    pub id: AttrId,
    pub name: String,
    pub is_index_sargable_collation: bool,
    /// `NOT NULL` column constraint, consulted by UPDATE/INSERT assembly's
    /// constraint predicate (§4.12).
    pub not_null: bool,
    /// True when the column has a server-evaluated `DEFAULT` expression,
    /// consulted by INSERT assembly to decide the prefix group of its
    /// permuted output row (§4.12).
    pub has_server_default: bool,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub heap_id: HeapId,
    pub attributes: Vec<AttributeInfo>,
    pub stats: ClassStatistics,
}

/// Class-level cardinality statistics (`ncard`/`tcard` seeds, §3 Node).
#[derive(Debug, Clone, Copy)]
pub struct ClassStatistics {
    pub row_count: f64,
    pub page_count: f64,
}

/// Per-attribute b-tree statistics, aggregated across every index that
/// covers the attribute (§3 Segment `info`).
#[derive(Debug, Clone, Copy)]
pub struct AttributeStatistics {
    pub distinct_values: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Index,
    UniqueIndex,
    PrimaryKey,
}

/// One `INDEX`/`UNIQUE`/primary-key constraint on a class, as consumed by
/// index discovery (§4.7).
#[derive(Debug, Clone)]
pub struct IndexConstraint {
    pub name: String,
    pub btid: Btid,
    pub kind: ConstraintKind,
    /// Ordered list of attribute ids the constraint is defined over.
    pub columns: Vec<AttrId>,
    pub asc: Vec<bool>,
}

/// Read-only schema access the query graph builder depends on
/// (`locator_fetch_class`, `sm_get_heap`, `sm_class_constraints`,
/// `sm_att_id`, `sm_att_info`, `sm_find_class`, `sm_find_index`,
/// `sm_get_class_with_statistics` in spec §6, behind one trait).
pub trait SchemaCatalog {
    fn class_info(&self, class: &ClassRef) -> Option<ClassInfo>;
    fn class_constraints(&self, class: &ClassRef) -> Vec<IndexConstraint>;
    fn attribute_statistics(&self, class: &ClassRef, attr: AttrId) -> Option<AttributeStatistics>;
}
