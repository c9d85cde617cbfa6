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

//! Regu-variable lowering (§4.9): translates an expression sub-tree into a
//! typed, interpretable post-order evaluator tree the execution engine
//! walks at run time.
//!
//! Every case below picks an opcode, recursively lowers its operands, and
//! allocates a result [`DbValue`] slot of the parse tree's declared type;
//! the case-split is meant to be exhaustive over every `PtOp`/`PtNode`
//! shape the grammar exposes (§4.9: "The case-split must be faithful").

use crate::error::{Error, Result};
use crate::graph::{NodeId, SegId, SubqueryId};
use crate::parse_tree::{AggFunction, HostVarRef, PtExpr, PtFunctionCall, PtName, PtNode, PtOp};
use crate::symbol_table::{SymbolTable, ValueHolder};
use crate::value::DbValue;

/// Ops that may short-circuit row evaluation and therefore must propagate a
/// predicate-continuation signal past themselves (§4.9's last paragraph,
/// §4.10's numbering flags): `LIKE`/`RLIKE`/`IN`/a nested sub-query.
pub fn may_block_row_evaluation(op: PtOp) -> bool {
    matches!(op, PtOp::Like | PtOp::NotLike | PtOp::Rlike | PtOp::NotRlike | PtOp::IsIn | PtOp::IsNotIn)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPosition {
    Ordinal(u32),
}

/// One interpretable evaluator node. Mirrors `REGU_VARIABLE`'s tagged-union
/// shape one-for-one rather than collapsing it into a generic AST, so the
/// eventual executor can match on `kind` exactly the way it matches on
/// `REGU_VARIABLE_TYPE`.
#[derive(Debug, Clone)]
pub enum ReguVarKind {
    /// An immediate, already-evaluated constant.
    DbVal(DbValue),
    /// A positional host variable (`?`), resolved by the caller at bind
    /// time rather than at lowering time.
    PosValue(u32),
    /// A value-list holder filled by a scan; shared, not copied, with the
    /// access spec that writes it (§4.8).
    Constant(ValueHolder),
    /// A raw attribute descriptor, for index key-construction and direct
    /// heap access (`seg` identifies which column of which node).
    AttrId(NodeId, SegId),
    /// The current scan's instance OID.
    Oid(NodeId),
    /// Arithmetic or scalar-function evaluation: opcode plus up to three
    /// lowered operands (the third only used by ternary ops like
    /// `BETWEEN`/`CASE`'s predicate arm) and the accumulated result type.
    InArith {
        op: PtOp,
        arg1: Box<ReguVar>,
        arg2: Option<Box<ReguVar>>,
        arg3: Option<Box<ReguVar>>,
        /// Set when this node, or anything beneath it, can block row
        /// evaluation (§4.9) and so must keep instnum/ordbynum numbering
        /// alive past itself.
        predicate_continues: bool,
    },
    /// A named multi-arg function call (sequence constructor, `IDXKEY`
    /// builder, user-defined scalar function, ...).
    Func { name: String, args: Vec<ReguVar> },
    /// A correlated or uncorrelated sub-query consumed as a table: a
    /// reference to its sorted list-file.
    ListId(SubqueryId),
    /// A positional reference into a list-file tuple, used by predicates
    /// evaluated over a `ListId` access spec.
    Position(ListPosition),
    /// Carries the `ORDERBY_NUM()` value set during evaluation.
    OrderbyNum,
}

#[derive(Debug, Clone)]
pub struct ReguVar {
    pub kind: ReguVarKind,
}

impl ReguVar {
    fn leaf(kind: ReguVarKind) -> Self {
        Self { kind }
    }

    /// Whether this node (or anything beneath it) can short-circuit row
    /// evaluation and so must keep the caller's numbering flags alive.
    pub fn predicate_continues(&self) -> bool {
        match &self.kind {
            ReguVarKind::InArith { predicate_continues, .. } => *predicate_continues,
            _ => false,
        }
    }
}

pub struct Lowerer<'a> {
    pub symtab: &'a SymbolTable,
}

impl<'a> Lowerer<'a> {
    pub fn new(symtab: &'a SymbolTable) -> Self {
        Self { symtab }
    }

    pub fn lower_node(&self, node: &PtNode) -> Result<ReguVar> {
        match node {
            PtNode::Value(v) if v.is_pseudo_const => Ok(ReguVar::leaf(ReguVarKind::DbVal(v.value.clone()))),
            PtNode::Value(v) => Ok(ReguVar::leaf(ReguVarKind::DbVal(v.value.clone()))),
            PtNode::HostVar(h) => self.lower_host_var(h),
            PtNode::Name(n) => self.lower_name(n),
            PtNode::Expr(e) => self.lower_expr(e),
            PtNode::Function(f) => self.lower_function(f),
            PtNode::List(items) => {
                let args = items.iter().map(|n| self.lower_node(n)).collect::<Result<Vec<_>>>()?;
                Ok(ReguVar::leaf(ReguVarKind::Func { name: "VALUE_LIST".into(), args }))
            }
            PtNode::Agg(_) => Err(Error::Unsupported {
                reason: "aggregate calls are lowered by the aggregate descriptor builder (§4.12), not as a scalar regu-variable".into(),
            }),
            PtNode::Query(_) => Err(Error::Unsupported {
                reason: "a sub-query used directly in value position must first be resolved to a ListId/TYPE_CONSTANT by the caller (§4.8)".into(),
            }),
        }
    }

    fn lower_host_var(&self, h: &HostVarRef) -> Result<ReguVar> {
        Ok(ReguVar::leaf(ReguVarKind::PosValue(h.position)))
    }

    /// Resolves a column reference against the symbol table, producing a
    /// `TYPE_CONSTANT` pointing at the owning spec's value holder, or a
    /// `TYPE_OID` for the pseudocolumn (§4.9).
    fn lower_name(&self, name: &PtName) -> Result<ReguVar> {
        let spec_id = name.spec_id.ok_or_else(|| Error::Internal {
            msg: "unresolved name reached regu-variable lowering".into(),
            file: file!(),
            line: line!(),
        })?;
        let (_, info) = self.symtab.resolve(spec_id).ok_or_else(|| Error::Internal {
            msg: format!("no table-info for spec {spec_id:?}"),
            file: file!(),
            line: line!(),
        })?;
        let node = info.node.ok_or_else(|| Error::Internal {
            msg: format!("table-info for spec {spec_id:?} has no bound node"),
            file: file!(),
            line: line!(),
        })?;
        if name.is_oid {
            return Ok(ReguVar::leaf(ReguVarKind::Oid(node)));
        }
        // The access spec is responsible for having already inserted a
        // holder for every segment it scans; lowering never invents one.
        let holder = info.holder_for_name(&name.name).cloned().ok_or_else(|| Error::Internal {
            msg: format!("no value holder bound for {}.{}", spec_id.0, name.name),
            file: file!(),
            line: line!(),
        })?;
        Ok(ReguVar::leaf(ReguVarKind::Constant(holder)))
    }

    fn lower_expr(&self, expr: &PtExpr) -> Result<ReguVar> {
        let arg1 = Box::new(self.lower_node(&expr.arg1)?);
        let arg2 = expr.arg2.as_deref().map(|n| self.lower_node(n)).transpose()?.map(Box::new);
        let arg3 = expr.arg3.as_deref().map(|n| self.lower_node(n)).transpose()?.map(Box::new);

        let mut predicate_continues = may_block_row_evaluation(expr.op);
        predicate_continues |= arg1.predicate_continues();
        predicate_continues |= arg2.as_deref().is_some_and(ReguVar::predicate_continues);
        predicate_continues |= arg3.as_deref().is_some_and(ReguVar::predicate_continues);
        if let Some(next) = &expr.or_next {
            predicate_continues |= self.lower_expr(next)?.predicate_continues();
        }

        Ok(ReguVar::leaf(ReguVarKind::InArith {
            op: expr.op,
            arg1,
            arg2,
            arg3,
            predicate_continues,
        }))
    }

    fn lower_function(&self, f: &PtFunctionCall) -> Result<ReguVar> {
        let args = f.args.iter().map(|a| self.lower_node(a)).collect::<Result<Vec<_>>>()?;
        Ok(ReguVar::leaf(ReguVarKind::Func { name: f.name.clone(), args }))
    }
}

/// Opcode bucket an aggregate function lowers to, for the aggregate
/// descriptor (§4.12); kept here because it shares `AggFunction` with the
/// regu-variable case-split above.
pub fn agg_opcode(f: AggFunction) -> &'static str {
    match f {
        AggFunction::CountStar => "COUNT_STAR",
        AggFunction::Count => "COUNT",
        AggFunction::Sum => "SUM",
        AggFunction::Avg => "AVG",
        AggFunction::Min => "MIN",
        AggFunction::Max => "MAX",
        AggFunction::GroupConcat => "GROUPBY_CONCAT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_tree::{PtExprInfo, PtValue, SpecId};

    fn int_value(v: i32) -> PtNode {
        PtNode::Value(PtValue {
            value: DbValue::Int(v),
            is_pseudo_const: true,
        })
    }

    fn name(spec_id: u32, attr: &str) -> PtNode {
        PtNode::Name(PtName {
            spec_id: Some(SpecId(spec_id)),
            name: attr.into(),
            is_oid: false,
        })
    }

    #[test]
    fn host_var_lowers_to_a_positional_placeholder() {
        let symtab = SymbolTable::default();
        let lowerer = Lowerer::new(&symtab);
        let rv = lowerer.lower_node(&PtNode::HostVar(HostVarRef { position: 3 })).unwrap();
        assert!(matches!(rv.kind, ReguVarKind::PosValue(3)));
    }

    #[test]
    fn unresolved_name_is_an_internal_error() {
        let symtab = SymbolTable::default();
        let lowerer = Lowerer::new(&symtab);
        let unresolved = PtNode::Name(PtName {
            spec_id: None,
            name: "a".into(),
            is_oid: false,
        });
        assert!(lowerer.lower_node(&unresolved).is_err());
    }

    #[test]
    fn oid_pseudocolumn_lowers_to_type_oid_without_a_holder() {
        let e = crate::test_support::build_single_table_eq();
        let symtab = crate::test_support::symtab_for(&e);
        let lowerer = Lowerer::new(&symtab);
        let oid_name = PtNode::Name(PtName {
            spec_id: Some(SpecId(0)),
            name: "@oid".into(),
            is_oid: true,
        });
        let rv = lowerer.lower_node(&oid_name).unwrap();
        assert!(matches!(rv.kind, ReguVarKind::Oid(_)));
    }

    #[test]
    fn column_reference_lowers_to_the_shared_value_holder() {
        let e = crate::test_support::build_single_table_eq();
        let symtab = crate::test_support::symtab_for(&e);
        let lowerer = Lowerer::new(&symtab);
        let rv = lowerer.lower_node(&name(0, "a")).unwrap();
        assert!(matches!(rv.kind, ReguVarKind::Constant(_)));
    }

    #[test]
    fn like_sets_predicate_continues_even_with_plain_operands() {
        let e = crate::test_support::build_single_table_eq();
        let symtab = crate::test_support::symtab_for(&e);
        let lowerer = Lowerer::new(&symtab);
        let expr = PtExpr {
            op: PtOp::Like,
            arg1: Box::new(name(0, "a")),
            arg2: Some(Box::new(int_value(1))),
            arg3: None,
            or_next: None,
            info: PtExprInfo::default(),
        };
        let rv = lowerer.lower_node(&PtNode::Expr(Box::new(expr))).unwrap();
        assert!(rv.predicate_continues());
    }

    #[test]
    fn plain_comparison_does_not_set_predicate_continues() {
        let e = crate::test_support::build_single_table_eq();
        let symtab = crate::test_support::symtab_for(&e);
        let lowerer = Lowerer::new(&symtab);
        let expr = PtExpr {
            op: PtOp::Eq,
            arg1: Box::new(name(0, "a")),
            arg2: Some(Box::new(int_value(1))),
            arg3: None,
            or_next: None,
            info: PtExprInfo::default(),
        };
        let rv = lowerer.lower_node(&PtNode::Expr(Box::new(expr))).unwrap();
        assert!(!rv.predicate_continues());
    }

    #[test]
    fn predicate_continues_propagates_through_or_next() {
        let e = crate::test_support::build_single_table_eq();
        let symtab = crate::test_support::symtab_for(&e);
        let lowerer = Lowerer::new(&symtab);
        let or_leaf = PtExpr {
            op: PtOp::Like,
            arg1: Box::new(name(0, "a")),
            arg2: Some(Box::new(int_value(2))),
            arg3: None,
            or_next: None,
            info: PtExprInfo::default(),
        };
        let top = PtExpr {
            op: PtOp::Eq,
            arg1: Box::new(name(0, "a")),
            arg2: Some(Box::new(int_value(1))),
            arg3: None,
            or_next: Some(Box::new(or_leaf)),
            info: PtExprInfo::default(),
        };
        let rv = lowerer.lower_node(&PtNode::Expr(Box::new(top))).unwrap();
        assert!(rv.predicate_continues());
    }

    #[test]
    fn list_node_lowers_to_a_value_list_function() {
        let symtab = SymbolTable::default();
        let lowerer = Lowerer::new(&symtab);
        let rv = lowerer.lower_node(&PtNode::List(vec![int_value(1), int_value(2)])).unwrap();
        match rv.kind {
            ReguVarKind::Func { name, args } => {
                assert_eq!(name, "VALUE_LIST");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected Func, got {other:?}"),
        }
    }

    #[test]
    fn agg_opcode_table_covers_every_function() {
        assert_eq!(agg_opcode(AggFunction::CountStar), "COUNT_STAR");
        assert_eq!(agg_opcode(AggFunction::Count), "COUNT");
        assert_eq!(agg_opcode(AggFunction::Sum), "SUM");
        assert_eq!(agg_opcode(AggFunction::Avg), "AVG");
        assert_eq!(agg_opcode(AggFunction::Min), "MIN");
        assert_eq!(agg_opcode(AggFunction::Max), "MAX");
        assert_eq!(agg_opcode(AggFunction::GroupConcat), "GROUPBY_CONCAT");
    }
}
