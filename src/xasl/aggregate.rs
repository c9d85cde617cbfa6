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

//! Aggregate descriptors (§4.12): one per `COUNT`/`SUM`/`AVG`/`MIN`/`MAX`/
//! `GROUP_CONCAT` call, whether the proc is a `BUILDVALUE_PROC` (no `GROUP
//! BY`) or a `BUILDLIST_PROC`'s `g_agg_list` (grouped).

use crate::catalog::Btid;
use crate::error::Result;
use crate::parse_tree::{AggFunction, PtAggCall};
use crate::regu::{Lowerer, ReguVar};
use crate::symbol_table::{SymbolTable, ValueHolder};
use crate::xasl::sort::{resolve_sort_list, SortSpec};

/// `COUNT_STAR`/`COUNT`/... opcode bucket the executor dispatches on,
/// reusing [`crate::regu::agg_opcode`]'s string table rather than
/// duplicating it (§4.9's note: "kept here because it shares `AggFunction`
/// with the regu-variable case-split").
pub type AggOpcode = &'static str;

/// One aggregate call, lowered. The accumulator pair (`value`, `value2`)
/// mirrors the executor's two-slot running-state convention: most
/// aggregates use only `value` (a running sum/count/min/max), `AVG` also
/// threads a running count through `value2`.
#[derive(Debug, Clone)]
pub struct AggregateDescriptor {
    pub function: AggOpcode,
    pub distinct: bool,
    /// `None` only for `COUNT(*)`, which has no operand.
    pub operand: Option<ReguVar>,
    pub result: ValueHolder,
    pub value: ValueHolder,
    pub value2: Option<ValueHolder>,
    /// A b-tree this aggregate can be answered from directly
    /// (`MIN`/`MAX`/`COUNT(*)` over an indexed column, or the whole class
    /// for `COUNT(*)`) without visiting the heap, set by the plan search
    /// and threaded through unchanged; `None` means "evaluate from the
    /// scan" (§8 scenario 5).
    pub btree_optimization: Option<Btid>,
    pub group_concat_separator: Option<String>,
    pub group_concat_order: Vec<SortSpec>,
    pub with_rollup: bool,
}

impl AggregateDescriptor {
    /// `flag_agg_optimize` in spec §8 scenario 5's vocabulary: true when
    /// this aggregate can skip row-by-row evaluation because a b-tree (or,
    /// for `COUNT(*)`, the class's own cardinality) already answers it.
    pub fn agg_optimize(&self) -> bool {
        self.btree_optimization.is_some() || self.function == "COUNT_STAR"
    }
}

/// Lowers one `PtAggCall` into an [`AggregateDescriptor`]. `btree_optimization`
/// is supplied by the caller (plan lowering consults the owning node's chosen
/// index, §4.7/§4.12 — this function has no access path context of its own).
pub fn lower_aggregate(
    lowerer: &Lowerer<'_>,
    symtab: &SymbolTable,
    call: &PtAggCall,
    select_list: &[crate::parse_tree::PtSelectItem],
    btree_optimization: Option<Btid>,
) -> Result<AggregateDescriptor> {
    let _ = symtab;
    let operand = call.arg.as_deref().map(|n| lowerer.lower_node(n)).transpose()?;
    let group_concat_order = resolve_sort_list(select_list, &call.group_concat_order)?;

    Ok(AggregateDescriptor {
        function: crate::regu::agg_opcode(call.function),
        distinct: call.distinct,
        operand,
        result: ValueHolder::new(),
        value: ValueHolder::new(),
        value2: matches!(call.function, AggFunction::Avg).then(ValueHolder::new),
        btree_optimization,
        group_concat_separator: call.group_concat_separator.clone(),
        group_concat_order,
        with_rollup: call.with_rollup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_tree::{PtName, PtNode};

    fn count_star_call() -> PtAggCall {
        PtAggCall {
            function: AggFunction::CountStar,
            arg: None,
            distinct: false,
            group_concat_separator: None,
            group_concat_order: Vec::new(),
            with_rollup: false,
        }
    }

    fn sum_call(distinct: bool) -> PtAggCall {
        PtAggCall {
            function: AggFunction::Sum,
            arg: Some(Box::new(PtNode::Name(PtName {
                spec_id: Some(crate::parse_tree::SpecId(0)),
                name: "a".into(),
                is_oid: false,
            }))),
            distinct,
            group_concat_separator: None,
            group_concat_order: Vec::new(),
            with_rollup: false,
        }
    }

    #[test]
    fn count_star_has_no_operand_and_is_always_optimizable() {
        let symtab = SymbolTable::default();
        let lowerer = Lowerer::new(&symtab);
        let call = count_star_call();
        let agg = lower_aggregate(&lowerer, &symtab, &call, &[], None).unwrap();
        assert_eq!(agg.function, "COUNT_STAR");
        assert!(agg.operand.is_none());
        assert!(agg.value2.is_none());
        // COUNT(*) is optimizable even with no btree handed in (§8 scenario 5).
        assert!(agg.agg_optimize());
    }

    #[test]
    fn sum_requires_a_btree_to_be_optimizable() {
        let e = crate::test_support::build_single_table_eq();
        let symtab = crate::test_support::symtab_for(&e);
        let lowerer = Lowerer::new(&symtab);
        let call = sum_call(false);

        let without_btree = lower_aggregate(&lowerer, &symtab, &call, &[], None).unwrap();
        assert!(!without_btree.agg_optimize());
        assert!(without_btree.operand.is_some());
        assert!(without_btree.value2.is_none());

        let btid = Btid {
            volid: 0,
            fileid: 1,
            root_pageid: 2,
        };
        let with_btree = lower_aggregate(&lowerer, &symtab, &call, &[], Some(btid)).unwrap();
        assert!(with_btree.agg_optimize());
    }

    #[test]
    fn avg_threads_a_second_accumulator_slot() {
        let e = crate::test_support::build_single_table_eq();
        let symtab = crate::test_support::symtab_for(&e);
        let lowerer = Lowerer::new(&symtab);
        let mut call = sum_call(false);
        call.function = AggFunction::Avg;
        let agg = lower_aggregate(&lowerer, &symtab, &call, &[], None).unwrap();
        assert_eq!(agg.function, "AVG");
        assert!(agg.value2.is_some());
    }

    #[test]
    fn distinct_flag_is_threaded_through() {
        let e = crate::test_support::build_single_table_eq();
        let symtab = crate::test_support::symtab_for(&e);
        let lowerer = Lowerer::new(&symtab);
        let call = sum_call(true);
        let agg = lower_aggregate(&lowerer, &symtab, &call, &[], None).unwrap();
        assert!(agg.distinct);
    }
}
