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

//! Predicate lowering (§4.10): turns a CNF conjunct list (each conjunct a
//! right-linear chain of `or_next` disjuncts) into a binary `PRED_EXPR`
//! tree, propagating the predicate-continuation ("numbering") flag that
//! tells the scan evaluator not to short-circuit past an
//! `INST_NUM`/`ROWNUM`/`ORDERBY_NUM` side effect.

use crate::error::Result;
use crate::parse_tree::PtExpr;
use crate::regu::{Lowerer, ReguVar};
use crate::symbol_table::SymbolTable;

/// A comparison or other leaf predicate over already-lowered
/// regu-variables.
#[derive(Debug, Clone)]
pub struct CompareExpr {
    pub op: crate::parse_tree::PtOp,
    pub lhs: ReguVar,
    pub rhs: Option<ReguVar>,
    pub rhs2: Option<ReguVar>,
}

#[derive(Debug, Clone)]
pub enum PredExpr {
    And(Box<PredExpr>, Box<PredExpr>),
    Or(Box<PredExpr>, Box<PredExpr>),
    Not(Box<PredExpr>),
    Compare(CompareExpr),
}

pub struct PredicateBuilder<'a> {
    lowerer: Lowerer<'a>,
}

impl<'a> PredicateBuilder<'a> {
    pub fn new(symtab: &'a SymbolTable) -> Self {
        Self { lowerer: Lowerer::new(symtab) }
    }

    /// Lowers one CNF conjunct list (e.g. a WHERE clause's terms) into a
    /// single predicate tree, joined by `AND` in reverse order so that the
    /// right-linear `or_next` chain each conjunct carries reconstructs
    /// correctly (§4.10).
    pub fn lower_conjuncts(&self, conjuncts: &[PtExpr]) -> Result<Option<PredExpr>> {
        let mut acc: Option<PredExpr> = None;
        for expr in conjuncts.iter().rev() {
            let lowered = self.lower_disjunct_chain(expr)?;
            acc = Some(match acc {
                None => lowered,
                Some(rest) => PredExpr::And(Box::new(lowered), Box::new(rest)),
            });
        }
        Ok(acc)
    }

    /// Lowers one conjunct's `or_next` chain in reverse order to rebuild
    /// the right-linear `OR` tree (§4.10).
    fn lower_disjunct_chain(&self, expr: &PtExpr) -> Result<PredExpr> {
        let mut chain = Vec::new();
        let mut cur = Some(expr);
        while let Some(e) = cur {
            chain.push(e);
            cur = e.or_next.as_deref();
        }

        let mut acc: Option<PredExpr> = None;
        for e in chain.into_iter().rev() {
            let leaf = self.lower_leaf(e)?;
            acc = Some(match acc {
                None => leaf,
                Some(rest) => PredExpr::Or(Box::new(leaf), Box::new(rest)),
            });
        }
        Ok(acc.expect("chain always has at least the conjunct itself"))
    }

    fn lower_leaf(&self, expr: &PtExpr) -> Result<PredExpr> {
        use crate::parse_tree::PtOp;
        if matches!(expr.op, PtOp::Not) {
            let inner = self.lower_leaf_as_expr(&expr.arg1)?;
            return Ok(PredExpr::Not(Box::new(inner)));
        }
        if matches!(expr.op, PtOp::And) {
            let lhs = self.lower_leaf_as_expr(&expr.arg1)?;
            let rhs = expr.arg2.as_deref().map(|n| self.lower_leaf_as_expr(n)).transpose()?;
            return Ok(match rhs {
                Some(rhs) => PredExpr::And(Box::new(lhs), Box::new(rhs)),
                None => lhs,
            });
        }
        if matches!(expr.op, PtOp::Or) {
            let lhs = self.lower_leaf_as_expr(&expr.arg1)?;
            let rhs = expr.arg2.as_deref().map(|n| self.lower_leaf_as_expr(n)).transpose()?;
            return Ok(match rhs {
                Some(rhs) => PredExpr::Or(Box::new(lhs), Box::new(rhs)),
                None => lhs,
            });
        }

        let lhs = self.lowerer.lower_node(&expr.arg1)?;
        let rhs = expr.arg2.as_deref().map(|n| self.lowerer.lower_node(n)).transpose()?;
        let rhs2 = expr.arg3.as_deref().map(|n| self.lowerer.lower_node(n)).transpose()?;
        Ok(PredExpr::Compare(CompareExpr { op: expr.op, lhs, rhs, rhs2 }))
    }

    fn lower_leaf_as_expr(&self, node: &crate::parse_tree::PtNode) -> Result<PredExpr> {
        match node {
            crate::parse_tree::PtNode::Expr(e) => self.lower_leaf(e),
            other => {
                let lhs = self.lowerer.lower_node(other)?;
                Ok(PredExpr::Compare(CompareExpr {
                    op: crate::parse_tree::PtOp::IsNotNull,
                    lhs,
                    rhs: None,
                    rhs2: None,
                }))
            }
        }
    }
}

impl PredExpr {
    /// Whether any leaf beneath this node can block row evaluation and so
    /// must keep instnum/ordbynum numbering alive past it.
    pub fn predicate_continues(&self) -> bool {
        match self {
            PredExpr::And(a, b) | PredExpr::Or(a, b) => a.predicate_continues() || b.predicate_continues(),
            PredExpr::Not(a) => a.predicate_continues(),
            PredExpr::Compare(c) => {
                c.lhs.predicate_continues()
                    || c.rhs.as_ref().is_some_and(ReguVar::predicate_continues)
                    || c.rhs2.as_ref().is_some_and(ReguVar::predicate_continues)
                    || crate::regu::may_block_row_evaluation(c.op)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_tree::{PtExprInfo, PtName, PtNode, PtOp, PtValue, SpecId};
    use crate::value::DbValue;

    fn name_node(n: &str) -> PtNode {
        PtNode::Name(PtName {
            spec_id: Some(SpecId(0)),
            name: n.into(),
            is_oid: false,
        })
    }

    fn int_node(v: i32) -> PtNode {
        PtNode::Value(PtValue {
            value: DbValue::Int(v),
            is_pseudo_const: true,
        })
    }

    fn cmp(op: PtOp, col: &str, v: i32) -> PtExpr {
        PtExpr {
            op,
            arg1: Box::new(name_node(col)),
            arg2: Some(Box::new(int_node(v))),
            arg3: None,
            or_next: None,
            info: PtExprInfo::default(),
        }
    }

    /// A symbol table with one spec (id 0) and a value holder for every
    /// name `cmp()` might reference, so regu-variable lowering can resolve
    /// `PtName`s the same way it would behind a real access spec (§4.8).
    fn symtab_with_spec_0() -> SymbolTable {
        let mut symtab = SymbolTable::default();
        symtab.push_frame();
        let mut info = crate::symbol_table::TableInfo {
            spec_id: SpecId(0),
            node: None,
            holders: Vec::new(),
        };
        for (i, col) in ["a", "b"].into_iter().enumerate() {
            info.holder_or_insert(crate::arena::Id::new(i as u32), col);
        }
        symtab.declare(info);
        symtab
    }

    #[test]
    fn two_conjuncts_fold_into_a_right_leaning_and_tree() {
        let symtab = symtab_with_spec_0();
        let builder = PredicateBuilder::new(&symtab);
        let conjuncts = vec![cmp(PtOp::Eq, "a", 1), cmp(PtOp::Gt, "b", 2)];
        let pred = builder.lower_conjuncts(&conjuncts).unwrap().expect("non-empty");
        match pred {
            PredExpr::And(lhs, rhs) => {
                assert!(matches!(*lhs, PredExpr::Compare(CompareExpr { op: PtOp::Eq, .. })));
                assert!(matches!(*rhs, PredExpr::Compare(CompareExpr { op: PtOp::Gt, .. })));
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn or_next_chain_folds_into_a_right_leaning_or_tree() {
        let symtab = symtab_with_spec_0();
        let builder = PredicateBuilder::new(&symtab);
        let mut first = cmp(PtOp::Eq, "a", 1);
        first.or_next = Some(Box::new(cmp(PtOp::Eq, "a", 2)));

        let pred = builder.lower_conjuncts(std::slice::from_ref(&first)).unwrap().expect("non-empty");
        match pred {
            PredExpr::Or(lhs, rhs) => {
                assert!(matches!(*lhs, PredExpr::Compare(_)));
                assert!(matches!(*rhs, PredExpr::Compare(_)));
            }
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn empty_conjunct_list_lowers_to_no_predicate() {
        let symtab = SymbolTable::default();
        let builder = PredicateBuilder::new(&symtab);
        assert!(builder.lower_conjuncts(&[]).unwrap().is_none());
    }

    #[test]
    fn like_leaf_sets_predicate_continues() {
        let symtab = symtab_with_spec_0();
        let builder = PredicateBuilder::new(&symtab);
        let like = cmp(PtOp::Like, "a", 0);
        let pred = builder.lower_conjuncts(&[like]).unwrap().unwrap();
        assert!(pred.predicate_continues());
    }

    #[test]
    fn plain_comparison_does_not_set_predicate_continues() {
        let symtab = symtab_with_spec_0();
        let builder = PredicateBuilder::new(&symtab);
        let pred = builder.lower_conjuncts(&[cmp(PtOp::Eq, "a", 1)]).unwrap().unwrap();
        assert!(!pred.predicate_continues());
    }
}

