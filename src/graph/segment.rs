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

//! Segment: one attribute reference grouped by owning node and name (§3
//! Data Model, "Segment").

use crate::catalog::AttributeStatistics;
use crate::graph::{NodeId, TermSet};

/// A column reference collapsed to one entry per (owning node, attribute
/// name): every occurrence of `t.a` in the statement shares a `Segment`, the
/// same way `qo_segment` is built once per distinct `(node, att_id)` pair
/// rather than once per `PT_NAME` occurrence.
#[derive(Debug, Clone)]
pub struct Segment {
    pub id: crate::graph::SegId,
    pub head: NodeId,
    pub name: String,
    /// True for the synthetic instance-OID pseudocolumn.
    pub is_oid: bool,
    /// `None` for a derived-table column, whose statistics (if any) live on
    /// the owning subquery descriptor instead.
    pub stats: Option<AttributeStatistics>,
    /// Terms that equality- or range-constrain this segment and are usable
    /// as an index key for it (populated by index discovery, §4.7).
    pub index_terms: TermSet,
}
