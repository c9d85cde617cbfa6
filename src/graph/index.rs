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

//! Index entry: one b-tree usable by a node, with the terms discovered to
//! drive it (§3 Data Model, "Index entry"; §4.7 Index discovery).

use crate::catalog::Btid;
use crate::graph::{NodeId, SegId, TermSet};

/// One column of a multi-column index, together with the terms bound to it.
#[derive(Debug, Clone, Default)]
pub struct IndexColumn {
    /// `None` when no segment of this node binds this column (the index is
    /// still usable as a prefix up to the first `None`).
    pub seg: Option<SegId>,
    /// Equality terms usable as an exact key for this column.
    pub equal_terms: TermSet,
    /// Range (`<`, `<=`, `>`, `>=`, `BETWEEN`, `IN`) terms usable as a
    /// bound for this column, applicable only on the last bound column of a
    /// key range (§4.11).
    pub range_terms: TermSet,
}

/// One usable b-tree, discovered for a single node, with the prefix of its
/// declared columns that this query can actually drive.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: crate::graph::IndexId,
    pub node: NodeId,
    pub btid: Btid,
    pub name: String,
    pub unique: bool,
    /// Declared column order, truncated after the first unbound/range
    /// column (an index can only be driven by a prefix of equalities
    /// followed by at most one range bound, §4.7).
    pub columns: Vec<IndexColumn>,
    /// Terms contributing to any column of this index, the union index
    /// discovery reports back to the term analyzer for `can_use_index`
    /// bookkeeping.
    pub terms: TermSet,
    /// True when every segment this query reads from the node is present in
    /// `columns`, allowing the scan to skip the heap entirely
    /// (index-only/covering scan).
    pub covers: bool,
    /// True when a descending scan direction was requested (`ORDER BY ...
    /// DESC` skip, §4.11) and the index supports it.
    pub use_descending: bool,
    /// True when this index alone satisfies the statement's `ORDER BY`
    /// without an extra sort step.
    pub orderby_skip: bool,
    pub groupby_skip: bool,
    /// `USING INDEX ... FORCE` pins this as the only index candidate
    /// considered for the owning node, bypassing cost comparison (§4.7).
    pub forced: bool,
}

impl IndexEntry {
    /// Number of leading columns actually bound by a term of this query.
    pub fn bound_prefix_len(&self) -> usize {
        self.columns
            .iter()
            .take_while(|c| c.seg.is_some() && !c.equal_terms.is_empty())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq_col() -> IndexColumn {
        let mut c = IndexColumn {
            seg: Some(crate::arena::Id::new(0)),
            ..Default::default()
        };
        c.equal_terms.add(crate::arena::Id::new(0));
        c
    }

    fn range_col() -> IndexColumn {
        let mut c = IndexColumn {
            seg: Some(crate::arena::Id::new(1)),
            ..Default::default()
        };
        c.range_terms.add(crate::arena::Id::new(1));
        c
    }

    #[test]
    fn bound_prefix_stops_at_the_first_range_only_column() {
        let entry_columns = vec![eq_col(), range_col(), eq_col()];
        assert_eq!(
            entry_columns
                .iter()
                .take_while(|c| c.seg.is_some() && !c.equal_terms.is_empty())
                .count(),
            1
        );
    }

    #[test]
    fn bound_prefix_counts_every_leading_equality_column() {
        let columns = vec![eq_col(), eq_col()];
        let entry = IndexEntry {
            id: crate::arena::Id::new(0),
            node: crate::arena::Id::new(0),
            btid: crate::catalog::Btid { volid: 0, fileid: 0, root_pageid: 0 },
            name: "idx".into(),
            unique: false,
            columns,
            terms: Default::default(),
            covers: false,
            use_descending: false,
            orderby_skip: false,
            groupby_skip: false,
            forced: false,
        };
        assert_eq!(entry.bound_prefix_len(), 2);
    }
}
