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

//! Term: one WHERE/ON conjunct after classification (§3 Data Model, "Term";
//! §4.4 Term analyzer; §4.5 Outer-join classifier).

use bitflags::bitflags;

use crate::graph::{NodeId, NodeSet, SegId, SegSet, SubquerySet};
use crate::parse_tree::PtExpr;

/// How a term participates in plan construction. Assigned once by the term
/// analyzer (§4.4) from the term's node/segment membership, then possibly
/// promoted by the outer-join classifier (§4.5) when the term sits on the
/// nullable side of an outer join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermClass {
    /// Touches exactly one node; usable as a SARG (`qo_is_sarg`).
    Sarg,
    /// Touches two or more nodes whose join type allows applying the term
    /// at the join step itself.
    Join,
    /// A two-or-more-node term that can only be applied once all of its
    /// nodes' outer-join dependencies are satisfied; may not be pushed
    /// below the outer join it references.
    AfterJoin,
    /// A two-or-more-node term evaluated while a set of outer-joined nodes
    /// is still in flight (between `DURING` candidates), e.g. an `ON`
    /// predicate that must see pre-null-padded rows.
    DuringJoin,
    /// Neither a SARG nor a join edge: a correlated-subquery residual, a
    /// non-indexable single-node predicate kept for completeness, or a
    /// `HAVING` conjunct.
    Other,
    /// A synthesized always-true placeholder term used to force an inner
    /// join to sit "on top of" a dependent outer join chain (Design Notes
    /// §9, the "dummy join" shape).
    DummyJoin,
    /// A join term that can only ever run last, after every other term
    /// touching its node set (transitively-closed outer-join residual).
    TotallyAfterJoin,
}

impl TermClass {
    pub fn is_sarg(self) -> bool {
        matches!(self, TermClass::Sarg)
    }

    pub fn is_join_like(self) -> bool {
        matches!(
            self,
            TermClass::Join | TermClass::AfterJoin | TermClass::DuringJoin | TermClass::TotallyAfterJoin
        )
    }
}

bitflags! {
    /// Per-term flags the analyzer and classifier set along the way
    /// (`qo_termclass` adjuncts). Kept distinct from `TermClass` because
    /// several are orthogonal to classification (e.g. a `Sarg` term can be
    /// single-predicate and still carry `NON_IDX_COLLATION`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TermFlags: u16 {
        /// A standalone, single-comparison-operator conjunct (as opposed to
        /// an `AND`-flattened sub-tree kept together for correctness).
        const SINGLE_PRED          = 0b0000_0001;
        const EQUALITY_OP          = 0b0000_0010;
        /// The term's right-hand side is an `IN`-list usable as
        /// `R_KEYLIST` (§4.11).
        const RANGELIST            = 0b0000_0100;
        /// The indexed segment's collation is not index-sargable for this
        /// predicate (catalog-reported, §6).
        const NON_IDX_SARG_COLL    = 0b0000_1000;
        /// Synthesized by equality-closure rewrite rather than written by
        /// the user (mirrors [`crate::parse_tree::PtExprInfo::transitive`]).
        const TRANSITIVE           = 0b0001_0000;
    }
}

/// Join-null-ability disposition of a `Join`/`AfterJoin`/`DuringJoin` term,
/// used by the O1-O4/W1-W4 reclassification matrix (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermJoinType {
    /// Not a join term (`Sarg`/`Other`/`DummyJoin`).
    NotApplicable,
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
}

/// One classified conjunct. `expr` is a private clone of the conjunct the
/// caller's tree owns: this crate never mutates the caller's parse tree
/// (Design Notes §9), so canonicalization (converse-swap, `BETWEEN`
/// decomposition) rewrites this copy only.
#[derive(Debug, Clone)]
pub struct Term {
    pub id: crate::graph::TermId,
    pub expr: PtExpr,
    /// 0 for a `WHERE` conjunct; the 1-based ordinal of the `PT_SPEC` whose
    /// `ON` clause this conjunct came from, otherwise.
    pub location: u32,
    pub class: TermClass,
    pub join_type: TermJoinType,
    pub segs: SegSet,
    pub nodes: NodeSet,
    /// For a two-node `Join`-like term: the nodes on the outer/preserved and
    /// inner/nullable side, respectively (`None` for a `Sarg`/`Other` term
    /// or an n-ary join term spanning more than two nodes).
    pub head: Option<NodeId>,
    pub tail: Option<NodeId>,
    /// Fraction of `head`/`tail` cross-product rows this term is estimated
    /// to retain, seeded from catalog statistics (§6) and refined by index
    /// discovery (§4.7).
    pub selectivity: f64,
    /// Cheap ordering key used to break ties among equally-selective terms
    /// before the plan search sees them; lower sorts first.
    pub rank: i32,
    /// 0 = not usable as an index key, 1 = usable as an equality key, 2 =
    /// usable as a range key (`can_use_index`, §4.7).
    pub can_use_index: u8,
    /// The one or two segments this term constrains, when it is usable as
    /// an index key (a `BETWEEN` term constrains two boundary segments of
    /// the same column; most terms constrain exactly one).
    pub index_segs: [Option<SegId>; 2],
    pub subqueries: SubquerySet,
    pub flags: TermFlags,
    /// Nodes this term's applicability depends on, beyond `nodes` itself
    /// (outer-join classifier output, §4.5); a `Join`-like term can only be
    /// scheduled once every node in `dep_set` has been joined.
    pub dep_set: NodeSet,
}

impl Term {
    pub fn touches(&self, node: NodeId) -> bool {
        self.nodes.contains(node)
    }

    pub fn arity(&self) -> usize {
        self.nodes.cardinality()
    }
}
