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

//! Node: one FROM-list entry (§3 Data Model, "Node").

use crate::catalog::ClassInfo;
use crate::graph::{IndexId, NodeId, NodeSet, SegSet, TermSet};
use crate::parse_tree::{JoinType, SpecHint, SpecId, UsingIndexHint};

/// A node's join-method disposition as inherited from its `PT_SPEC`. `None`
/// is the first spec (or a comma-joined one); the rest mirror
/// [`JoinType`](crate::parse_tree::JoinType) one-for-one plus the
/// graph-local `Dummy` kind the outer-join classifier (§4.5) assigns to a
/// synthesized always-true inner join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeJoinType {
    None,
    Inner,
    LeftOuter,
    RightOuter,
    Cross,
}

impl From<JoinType> for NodeJoinType {
    fn from(jt: JoinType) -> Self {
        match jt {
            JoinType::Inner => NodeJoinType::Inner,
            JoinType::LeftOuter => NodeJoinType::LeftOuter,
            JoinType::RightOuter => NodeJoinType::RightOuter,
            JoinType::Cross => NodeJoinType::Cross,
        }
    }
}

/// One FROM-list entry after graph construction: a base class scan, or a
/// derived-table/correlated-subquery scan whose `info` is `None` (its shape
/// comes from the subquery descriptor instead, §3 "Subquery descriptor").
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    /// The `PT_SPEC` this node was built from; kept for diagnostics and for
    /// re-attaching the winning plan to the caller's tree.
    pub spec_id: SpecId,
    pub range_var: String,
    /// `None` for a derived-table node (its `Segment`s still exist, but
    /// their cardinality seeds come from the subquery descriptor rather than
    /// class statistics).
    pub info: Option<ClassInfo>,
    /// Estimated row count of the underlying class/derived table before any
    /// predicate is applied.
    pub ncard: f64,
    /// Estimated page count of the underlying heap, seed for scan cost.
    pub tcard: f64,
    /// Segments (attributes) of this node referenced anywhere in the
    /// statement.
    pub segs: SegSet,
    /// Single-node (`SARG`) terms that apply to this node alone.
    pub sargs: TermSet,
    /// Nodes this node's outer-join nullability depends on (§4.5).
    pub dep_set: NodeSet,
    /// The outer-join-specific subset of `dep_set` contributed by terms
    /// classified `AFTER_JOIN`/`DURING_JOIN` against this node, kept
    /// distinct from `dep_set` because join-order search consults the two
    /// independently (Design Notes §9).
    pub outer_dep_set: NodeSet,
    /// Whether any usable SARG exists for this node standing alone.
    pub sargable: bool,
    /// Running floor of this node's own SARG selectivity, multiplied down
    /// by each attached SARG term and clamped at `1 / ncard` (§4.6).
    pub selectivity: f64,
    pub join_type: NodeJoinType,
    pub indexes: Vec<IndexId>,
    pub using_index: Option<Vec<UsingIndexHint>>,
    pub hint: SpecHint,
    /// The always-selected instance-OID segment, when the underlying scan
    /// needs one (heap scan staging, update/delete target, §4.12).
    pub oid_seg: Option<crate::graph::SegId>,
}

impl Node {
    pub fn is_class_scan(&self) -> bool {
        self.info.is_some()
    }

    pub fn is_derived(&self) -> bool {
        self.info.is_none()
    }
}
