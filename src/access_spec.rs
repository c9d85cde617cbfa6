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

//! Access-spec lowering (§4.11): sequential, index, and list (sub-query)
//! scans, including index key-range construction from the terms index
//! discovery bound to each column.

use crate::env::Env;
use crate::error::{Error, Result};
use crate::graph::index::IndexColumn;
use crate::graph::{IndexId, NodeId, SubqueryId, TermId};
use crate::parse_tree::{PtExpr, PtNode, PtOp};
use crate::predicate::{PredExpr, PredicateBuilder};
use crate::regu::{Lowerer, ReguVar};
use crate::symbol_table::SymbolTable;

/// The five two-bound range shapes `query_graph.c` names, plus the two
/// one-sided-infinite shapes a lone `<`/`>` produces (§4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    EqNa,
    GeLe,
    GeLt,
    GtLe,
    GtLt,
    InfLe,
    InfLt,
    GeInf,
    GtInf,
}

#[derive(Debug, Clone)]
pub struct KeyRange {
    pub op: RangeOp,
    pub lower: Option<ReguVar>,
    pub upper: Option<ReguVar>,
}

/// One row of an all-equality key (`F_IDXKEY` over every bound column).
#[derive(Debug, Clone)]
pub struct IdxKey {
    pub columns: Vec<ReguVar>,
}

#[derive(Debug, Clone)]
pub enum KeyRangeKind {
    /// All-equality prefix: one key per combination of equality values
    /// (§4.11).
    KeyList(Vec<IdxKey>),
    /// A `RANGE(...)` list on exactly one (the last bound) column, with
    /// every other column held to its equality value across the product.
    RangeList(Vec<KeyRange>),
    /// A single two-bound range on the last bound column.
    TwoBound(KeyRange),
}

#[derive(Debug, Clone)]
pub struct IndexScanInfo {
    pub index_id: IndexId,
    pub key_range: KeyRangeKind,
    /// Extra, non-key-range-expressible predicate still evaluated against
    /// each key-qualifying row before it is returned (the key filter).
    pub key_filter: Option<PredExpr>,
    pub coverage: bool,
    pub use_descending: bool,
    pub orderby_skip: bool,
    pub groupby_skip: bool,
}

#[derive(Debug, Clone)]
pub enum AccessKind {
    Sequential { node: NodeId },
    Index { node: NodeId, info: IndexScanInfo },
    List { subquery: SubqueryId },
}

#[derive(Debug, Clone)]
pub struct AccessSpec {
    pub kind: AccessKind,
    /// The data filter: whatever of the node's predicates the key range
    /// (if any) did not already express.
    pub predicate: Option<PredExpr>,
    pub key_limit: Option<KeyLimit>,
}

/// Fused `LIMIT`/per-index key-limit hint (§4.11): `upper` takes the
/// `LEAST` of every contributing upper bound, `lower` the `GREATEST`.
#[derive(Debug, Clone)]
pub struct KeyLimit {
    pub upper: ReguVar,
    pub lower: Option<ReguVar>,
}

/// Builds a sequential (heap) scan over `node`'s WHERE-derived SARGs; no
/// key range, every SARG becomes the data filter (§4.11 "sequential class
/// scan").
pub fn build_sequential(e: &Env, symtab: &SymbolTable, node: NodeId, sarg_terms: &[TermId]) -> Result<AccessSpec> {
    let builder = PredicateBuilder::new(symtab);
    let conjuncts: Vec<PtExpr> = sarg_terms.iter().map(|&id| e.terms[id].expr.clone()).collect();
    let predicate = builder.lower_conjuncts(&conjuncts)?;
    Ok(AccessSpec {
        kind: AccessKind::Sequential { node },
        predicate,
        key_limit: None,
    })
}

/// Builds an index scan over `node` through `index_id`, partitioning
/// `sarg_terms` into the ones the chosen index's bound columns can express
/// as a key range and the rest (the key filter).
pub fn build_index_scan(e: &Env, symtab: &SymbolTable, node: NodeId, index_id: IndexId, sarg_terms: &[TermId]) -> Result<AccessSpec> {
    let index = &e.indexes[index_id];
    let lowerer = Lowerer::new(symtab);

    let bound_prefix = index.bound_prefix_len().max(if index.columns.iter().any(|c| !c.range_terms.is_empty()) { 1 } else { 0 });
    let last_col = index.columns.get(bound_prefix.saturating_sub(1).min(index.columns.len().saturating_sub(1)));

    let key_range = if bound_prefix == 0 {
        // Degenerate zero-column case: full range over the first column's
        // domain (§4.11).
        KeyRangeKind::TwoBound(KeyRange {
            op: RangeOp::InfLt,
            lower: None,
            upper: None,
        })
    } else if let Some(col) = last_col.filter(|c| !c.range_terms.is_empty() && c.equal_terms.is_empty()) {
        if let Some(keys) = build_in_list_keys(&lowerer, index, bound_prefix, e, col)? {
            KeyRangeKind::KeyList(keys)
        } else {
            let mut ranges = Vec::new();
            for term_id in col.range_terms.iter() {
                let expr = &e.terms[term_id].expr;
                ranges.push(lower_comparison_to_range(&lowerer, expr)?);
            }
            KeyRangeKind::RangeList(ranges)
        }
    } else if all_prefix_columns_equality(index, bound_prefix) {
        let keys = build_equality_keys(&lowerer, index, bound_prefix, e)?;
        KeyRangeKind::KeyList(keys)
    } else if let Some(col) = last_col.filter(|c| !c.range_terms.is_empty()) {
        let term_id = col.range_terms.iter().next().ok_or_else(|| Error::Internal {
            msg: "range_terms reported non-empty but iterator was empty".into(),
            file: file!(),
            line: line!(),
        })?;
        let expr = &e.terms[term_id].expr;
        KeyRangeKind::TwoBound(lower_comparison_to_range(&lowerer, expr)?)
    } else {
        KeyRangeKind::TwoBound(KeyRange {
            op: RangeOp::InfLt,
            lower: None,
            upper: None,
        })
    };

    let key_range_terms = index.columns.iter().fold(crate::graph::TermSet::default(), |mut acc, c| {
        acc.union_with(&c.equal_terms);
        acc.union_with(&c.range_terms);
        acc
    });
    let remaining: Vec<PtExpr> = sarg_terms
        .iter()
        .filter(|&&id| !key_range_terms.contains(id))
        .map(|&id| e.terms[id].expr.clone())
        .collect();
    let builder = PredicateBuilder::new(symtab);
    let key_filter = builder.lower_conjuncts(&remaining)?;

    Ok(AccessSpec {
        kind: AccessKind::Index {
            node,
            info: IndexScanInfo {
                index_id,
                key_range,
                key_filter,
                coverage: index.covers && remaining.is_empty(),
                use_descending: index.use_descending,
                orderby_skip: index.orderby_skip,
                groupby_skip: index.groupby_skip,
            },
        },
        predicate: None,
        key_limit: None,
    })
}

fn all_prefix_columns_equality(index: &crate::graph::IndexEntry, prefix: usize) -> bool {
    index.columns.iter().take(prefix).all(|c| !c.equal_terms.is_empty())
}

fn build_equality_keys(lowerer: &Lowerer<'_>, index: &crate::graph::IndexEntry, prefix: usize, e: &Env) -> Result<Vec<IdxKey>> {
    let mut columns = Vec::new();
    for col in index.columns.iter().take(prefix) {
        let term_id = col.equal_terms.iter().next().ok_or_else(|| Error::Internal {
            msg: "equality column reported bound with no equal_terms".into(),
            file: file!(),
            line: line!(),
        })?;
        let expr = &e.terms[term_id].expr;
        let value_node = expr.arg2.as_deref().ok_or_else(|| Error::Internal {
            msg: "equality term missing rhs operand".into(),
            file: file!(),
            line: line!(),
        })?;
        columns.push(lowerer.lower_node(value_node)?);
    }
    Ok(vec![IdxKey { columns }])
}

/// Recognizes a single `IN (v1, v2, ...)` term bound to the last prefix
/// column and expands it into one all-equality key per list element, each
/// sharing the same equality values on the preceding prefix columns
/// (§4.11's `R_KEYLIST` shape; §8 scenario "`a IN (1,2,3)` with an index on
/// `a`"). Returns `None` when the column's lone range term isn't such an
/// `IN`-list, so the caller falls back to range-list/two-bound handling.
fn build_in_list_keys(lowerer: &Lowerer<'_>, index: &crate::graph::IndexEntry, prefix: usize, e: &Env, last_col: &IndexColumn) -> Result<Option<Vec<IdxKey>>> {
    if last_col.range_terms.cardinality() != 1 {
        return Ok(None);
    }
    let term_id = last_col.range_terms.iter().next().expect("cardinality checked above");
    let expr = &e.terms[term_id].expr;
    if expr.op != PtOp::IsIn {
        return Ok(None);
    }
    let Some(PtNode::List(items)) = expr.arg2.as_deref() else {
        return Ok(None);
    };

    let mut prefix_values = Vec::new();
    for col in index.columns.iter().take(prefix.saturating_sub(1)) {
        let eq_term = col.equal_terms.iter().next().ok_or_else(|| Error::Internal {
            msg: "equality column reported bound with no equal_terms".into(),
            file: file!(),
            line: line!(),
        })?;
        let eq_expr = &e.terms[eq_term].expr;
        let value_node = eq_expr.arg2.as_deref().ok_or_else(|| Error::Internal {
            msg: "equality term missing rhs operand".into(),
            file: file!(),
            line: line!(),
        })?;
        prefix_values.push(lowerer.lower_node(value_node)?);
    }

    let mut keys = Vec::with_capacity(items.len());
    for item in items {
        let mut columns = prefix_values.clone();
        columns.push(lowerer.lower_node(item)?);
        keys.push(IdxKey { columns });
    }
    Ok(Some(keys))
}

fn lower_comparison_to_range(lowerer: &Lowerer<'_>, expr: &PtExpr) -> Result<KeyRange> {
    let value = expr.arg2.as_deref().map(|n| lowerer.lower_node(n)).transpose()?;
    match expr.op {
        PtOp::Eq | PtOp::NullSafeEq => Ok(KeyRange {
            op: RangeOp::EqNa,
            lower: value.clone(),
            upper: value,
        }),
        PtOp::Lt => Ok(KeyRange { op: RangeOp::InfLt, lower: None, upper: value }),
        PtOp::Le => Ok(KeyRange { op: RangeOp::InfLe, lower: None, upper: value }),
        PtOp::Gt => Ok(KeyRange { op: RangeOp::GtInf, lower: value, upper: None }),
        PtOp::Ge => Ok(KeyRange { op: RangeOp::GeInf, lower: value, upper: None }),
        PtOp::Between | PtOp::Range => {
            let lower = value;
            let upper = expr.arg3.as_deref().map(|n| lowerer.lower_node(n)).transpose()?;
            Ok(KeyRange { op: RangeOp::GeLe, lower, upper })
        }
        _ => Err(Error::Unsupported {
            reason: format!("{:?} cannot be lowered to an index key range", expr.op),
        }),
    }
}

/// Fuses a `LIMIT` clause with a per-index `USING INDEX ... key_limit` hint
/// (§4.11): the upper bound is the `LEAST` of contributors, the lower
/// bound the `GREATEST`.
pub fn fuse_key_limit(lowerer: &Lowerer<'_>, query_limit: Option<&crate::parse_tree::PtLimit>, index_hint: Option<&crate::parse_tree::PtNode>) -> Result<Option<KeyLimit>> {
    let query = query_limit.map(|l| -> Result<(ReguVar, Option<ReguVar>)> {
        let upper = lowerer.lower_node(&l.upper)?;
        let lower = l.lower.as_ref().map(|n| lowerer.lower_node(n)).transpose()?;
        Ok((upper, lower))
    }).transpose()?;
    let hint = index_hint.map(|n| lowerer.lower_node(n)).transpose()?;

    match (query, hint) {
        (None, None) => Ok(None),
        (Some((upper, lower)), None) => Ok(Some(KeyLimit { upper, lower })),
        (None, Some(upper)) => Ok(Some(KeyLimit { upper, lower: None })),
        (Some((q_upper, lower)), Some(h_upper)) => Ok(Some(KeyLimit {
            upper: ReguVar {
                kind: crate::regu::ReguVarKind::Func {
                    name: "LEAST".into(),
                    args: vec![q_upper, h_upper],
                },
            },
            lower,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_info(e: &Env) -> (NodeId, IndexId, Vec<TermId>) {
        let node = e.nodes.ids().next().unwrap();
        let index_id = e.nodes[node].indexes[0];
        let sarg_terms: Vec<TermId> = e.nodes[node].sargs.iter().collect();
        (node, index_id, sarg_terms)
    }

    /// §8 scenario 1: `SELECT * FROM t WHERE a = 1` with an index on `a` is
    /// a single-key `R_KEYLIST`.
    #[test]
    fn equality_sarg_lowers_to_a_single_equality_key() {
        let e = crate::test_support::build_single_table_eq();
        let symtab = crate::test_support::symtab_for(&e);
        let (node, index_id, sarg_terms) = scan_info(&e);
        let spec = build_index_scan(&e, &symtab, node, index_id, &sarg_terms).unwrap();
        let AccessKind::Index { info, .. } = spec.kind else { panic!("expected an index scan") };
        match info.key_range {
            KeyRangeKind::KeyList(keys) => {
                assert_eq!(keys.len(), 1);
                assert_eq!(keys[0].columns.len(), 1);
            }
            other => panic!("expected a single-key KeyList, got {other:?}"),
        }
    }

    /// §8 scenario 2: `SELECT * FROM t WHERE a IN (1,2,3)` with an index on
    /// `a` is `R_KEYLIST` with three equal-range keys.
    #[test]
    fn in_list_sarg_expands_to_one_key_per_element() {
        let e = crate::test_support::build_single_table_in_list();
        let symtab = crate::test_support::symtab_for(&e);
        let (node, index_id, sarg_terms) = scan_info(&e);
        let spec = build_index_scan(&e, &symtab, node, index_id, &sarg_terms).unwrap();
        let AccessKind::Index { info, .. } = spec.kind else { panic!("expected an index scan") };
        match info.key_range {
            KeyRangeKind::KeyList(keys) => {
                assert_eq!(keys.len(), 3);
                for key in &keys {
                    assert_eq!(key.columns.len(), 1);
                }
            }
            other => panic!("expected a three-element KeyList, got {other:?}"),
        }
        assert!(info.key_filter.is_none(), "the whole IN-list should be absorbed into the key range");
    }

    /// §8 scenario 3: `SELECT * FROM t WHERE a BETWEEN 1 AND 10` with an
    /// index on `a` is a single-range `R_RANGELIST` with a `GE_LE` bound.
    #[test]
    fn between_sarg_lowers_to_a_rangelist_with_one_ge_le_range() {
        let e = crate::test_support::build_single_table_between();
        let symtab = crate::test_support::symtab_for(&e);
        let (node, index_id, sarg_terms) = scan_info(&e);
        let spec = build_index_scan(&e, &symtab, node, index_id, &sarg_terms).unwrap();
        let AccessKind::Index { info, .. } = spec.kind else { panic!("expected an index scan") };
        match info.key_range {
            KeyRangeKind::RangeList(ranges) => {
                assert_eq!(ranges.len(), 1);
                assert_eq!(ranges[0].op, RangeOp::GeLe);
            }
            other => panic!("expected a one-range RangeList, got {other:?}"),
        }
    }

    #[test]
    fn sequential_scan_pushes_every_sarg_into_the_data_filter() {
        let e = crate::test_support::build_single_table_eq();
        let symtab = crate::test_support::symtab_for(&e);
        let (node, _, sarg_terms) = scan_info(&e);
        let spec = build_sequential(&e, &symtab, node, &sarg_terms).unwrap();
        assert!(matches!(spec.kind, AccessKind::Sequential { .. }));
        assert!(spec.predicate.is_some());
    }
}
