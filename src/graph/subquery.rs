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

//! Subquery descriptor: one nested/correlated `PT_QUERY` appearing inside
//! an outer statement's expression tree (§3 Data Model, "Subquery
//! descriptor").

use crate::graph::{NodeSet, SegSet, TermSet};
use crate::parse_tree::PtQuery;

/// How a subquery is consumed at its use site, mirroring the three
/// `PT_NODE` unboxing shapes spec §6 names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryUse {
    /// `EXISTS (...)`/`IN (...)`: only emptiness matters.
    Predicate,
    /// Unboxed as a single scalar value.
    Scalar,
    /// Unboxed as a table, i.e. a derived-table FROM-list entry; these are
    /// represented as ordinary [`crate::graph::Node`]s with `info: None`
    /// rather than through this descriptor.
    Table,
}

/// A correlated or uncorrelated nested query, together with the outer-query
/// elements its correlation actually reaches. An uncorrelated subquery has
/// empty `outer_segs`/`outer_nodes`/`outer_terms` and is eligible to be
/// evaluated once and cached for the whole statement (§4.12 `aptr`
/// linkage); a correlated one must be re-evaluated per outer row.
#[derive(Debug, Clone)]
pub struct Subquery {
    pub id: crate::graph::SubqueryId,
    pub query: Box<PtQuery>,
    pub use_kind: SubqueryUse,
    /// Outer-query segments this subquery's WHERE clause correlates on.
    pub outer_segs: SegSet,
    /// Outer-query nodes implied by `outer_segs`, cached so the term
    /// analyzer doesn't need to re-derive it per reference.
    pub outer_nodes: NodeSet,
    /// Terms of the *outer* statement that reference this subquery in their
    /// expression tree (e.g. the `x IN (subquery)` term itself).
    pub outer_terms: TermSet,
}

impl Subquery {
    pub fn is_correlated(&self) -> bool {
        !self.outer_nodes.is_empty()
    }
}
