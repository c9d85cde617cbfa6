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

//! Term analyzer (§4.4): classifies each WHERE/ON conjunct, determines
//! indexability of its operands, and assigns selectivity/rank.
//!
//! This is the first of two classification passes; [`crate::outer_join`]
//! runs a second pass that reclassifies terms sitting on the nullable side
//! of an outer join.

use crate::env::{self, Env};
use crate::error::Result;
use crate::graph::term::{TermClass, TermFlags, TermJoinType};
use crate::graph::{NodeId, NodeSet, SegId, SegSet, SubquerySet, Term};
use crate::parse_tree::{JoinType, PtExpr, PtNode, PtOp, PtSpec, PtStatement, SpecId};

/// Fixed operator-to-rank table (§4.4): `NAME/VALUE=0, LIGHT=1, MEDIUM=2,
/// HEAVY=3, FUNCTION=4, QUERY=8`.
fn op_rank(op: PtOp) -> i32 {
    use PtOp::*;
    match op {
        Eq | Ne | Lt | Le | Gt | Ge | NullSafeEq | Is | IsNot | IsNull | IsNotNull => 1,
        Between | NotBetween | BetweenEqNa | Range | IsIn | IsNotIn => 2,
        Like | NotLike | Rlike | NotRlike => 3,
        And | Or | Not | Xor | Plus | Minus | Times | Divide | UnaryMinus | Case => 4,
        Exists => 8,
        InstNum | Rownum | OrderbyNum => 0,
    }
}

fn is_lhs_indexable(op: PtOp) -> bool {
    matches!(
        op,
        PtOp::Eq | PtOp::Lt | PtOp::Le | PtOp::Gt | PtOp::Ge | PtOp::Between | PtOp::Range | PtOp::IsIn
    )
}

fn is_rhs_indexable(op: PtOp) -> bool {
    op.converse().is_some() && matches!(op, PtOp::Eq | PtOp::Lt | PtOp::Le | PtOp::Gt | PtOp::Ge)
}

fn is_equality(op: PtOp) -> bool {
    matches!(op, PtOp::Eq | PtOp::NullSafeEq)
}

fn references_numbering(expr: &PtExpr) -> bool {
    references_op_in_tree(expr, PtOp::InstNum) || references_op_in_tree(expr, PtOp::Rownum) || references_op_in_tree(expr, PtOp::OrderbyNum)
}

/// Whether `op` appears anywhere in `expr`'s tree (including its `or_next`
/// chain and beneath an aggregate's argument). Shared by
/// [`references_numbering`] here and by plan lowering's instnum/ordbynum
/// residual split (§4.11), so both walk the same shape the same way.
pub(crate) fn references_op_in_tree(expr: &PtExpr, op: PtOp) -> bool {
    if expr.op == op {
        return true;
    }
    node_references_op_in_tree(&expr.arg1, op)
        || expr.arg2.as_deref().is_some_and(|n| node_references_op_in_tree(n, op))
        || expr.arg3.as_deref().is_some_and(|n| node_references_op_in_tree(n, op))
        || expr.or_next.as_deref().is_some_and(|e| references_op_in_tree(e, op))
}

fn node_references_op_in_tree(node: &PtNode, op: PtOp) -> bool {
    match node {
        PtNode::Expr(e) => references_op_in_tree(e, op),
        PtNode::Agg(a) => a.arg.as_deref().is_some_and(|n| node_references_op_in_tree(n, op)),
        _ => false,
    }
}

/// Collects the set of nodes/segments an expression tree touches, and every
/// nested sub-query it contains, registering fresh [`crate::graph::Subquery`]
/// descriptors as it goes.
struct RefCollector<'a> {
    env: &'a mut Env,
    segs: SegSet,
    nodes: NodeSet,
    subqueries: SubquerySet,
}

impl<'a> RefCollector<'a> {
    fn visit_expr(&mut self, expr: &PtExpr) {
        self.visit_node(&expr.arg1);
        if let Some(n) = &expr.arg2 {
            self.visit_node(n);
        }
        if let Some(n) = &expr.arg3 {
            self.visit_node(n);
        }
        if let Some(next) = &expr.or_next {
            self.visit_expr(next);
        }
    }

    fn visit_node(&mut self, node: &PtNode) {
        match node {
            PtNode::Name(name) => {
                if let Some(spec_id) = name.spec_id {
                    if let Some(node_id) = node_for_spec(self.env, spec_id) {
                        self.nodes.add(node_id);
                        if let Some(seg_id) = seg_for_name(self.env, node_id, name) {
                            self.segs.add(seg_id);
                        }
                    }
                }
            }
            PtNode::Expr(e) => self.visit_expr(e),
            PtNode::Function(f) => {
                for arg in &f.args {
                    self.visit_node(arg);
                }
            }
            PtNode::Agg(a) => {
                if let Some(arg) = &a.arg {
                    self.visit_node(arg);
                }
            }
            PtNode::Query(q) => {
                let sub_id = register_subquery(self.env, q, &self.nodes, &self.segs);
                self.subqueries.add(sub_id);
            }
            PtNode::List(items) => {
                for item in items {
                    self.visit_node(item);
                }
            }
            PtNode::Value(_) | PtNode::HostVar(_) => {}
        }
    }
}

fn node_for_spec(env: &Env, spec_id: SpecId) -> Option<NodeId> {
    env.nodes.iter().find(|(_, n)| n.spec_id == spec_id).map(|(id, _)| id)
}

fn seg_for_name(env: &Env, node_id: NodeId, name: &crate::parse_tree::PtName) -> Option<SegId> {
    env.segs
        .iter()
        .find(|(_, s)| s.head == node_id && (s.is_oid == name.is_oid) && (name.is_oid || s.name == name.name))
        .map(|(id, _)| id)
}

/// Registers a (possibly correlated) sub-query the first time it's seen.
/// Correlation is approximated by checking whether the sub-query's own
/// WHERE conjuncts reference any spec id outside its own FROM list — a
/// conservative stand-in for the full free-segment walk `query_graph.c`
/// performs, adequate because this crate never needs to *execute* the
/// sub-query, only to know whether it may be cached across outer rows.
fn register_subquery(env: &mut Env, query: &crate::parse_tree::PtQuery, outer_nodes: &NodeSet, outer_segs: &SegSet) -> crate::graph::SubqueryId {
    let use_kind = crate::graph::subquery::SubqueryUse::Scalar;
    let id = env.subqueries.push(crate::graph::Subquery {
        id: crate::arena::Id::new(env.subqueries.len() as u32),
        query: Box::new(query.clone()),
        use_kind,
        outer_segs: outer_segs.clone(),
        outer_nodes: outer_nodes.clone(),
        outer_terms: Default::default(),
    });
    id
}

/// Determines indexability and, if indexable, canonicalizes a private copy
/// of the expression so the bound attribute always sits in `arg1` (§4.4:
/// "If LHS is not indexable but RHS is, arguments are swapped").
fn analyze_indexability(expr: &mut PtExpr, env: &Env, nodes: &NodeSet) -> (u8, [Option<SegId>; 2], TermFlags) {
    let mut flags = TermFlags::empty();
    if nodes.cardinality() == 0 || nodes.cardinality() > 2 {
        return (0, [None, None], flags);
    }

    let arg1_is_name = matches!(expr.arg1.as_ref(), PtNode::Name(_));
    let arg2_is_query = matches!(expr.arg2.as_deref(), Some(PtNode::Query(_)));

    if matches!(expr.op, PtOp::IsIn | PtOp::IsNotIn) && arg2_is_query {
        // `col IN (subquery)`: the subquery is unboxed as a table, not a
        // value, so this is never an index key (§4.4).
        return (0, [None, None], flags);
    }

    let mut op = expr.op;
    let arg2_is_name = matches!(expr.arg2.as_deref(), Some(PtNode::Name(_)));
    if !arg1_is_name && arg2_is_name && is_rhs_indexable(op) {
        // `const op attr` with a reversible op: canonicalize to `attr op
        // const` on our private copy (§4.4; Design Notes §9 forbids mutating
        // the caller's tree, so this never touches the original expression).
        let converse = op.converse().expect("checked by is_rhs_indexable");
        std::mem::swap(&mut expr.arg1, expr.arg2.as_mut().unwrap());
        op = converse;
        expr.op = converse;
    }

    if !matches!(expr.arg1.as_ref(), PtNode::Name(_)) || !is_lhs_indexable(op) {
        return (0, [None, None], flags);
    }

    let lhs_seg = as_name(&expr.arg1).and_then(|n| resolve_seg_and_check_collation(env, n, &mut flags));
    let rhs_seg = expr
        .arg2
        .as_ref()
        .and_then(|n| as_name(n))
        .and_then(|n| resolve_seg_and_check_collation(env, n, &mut flags));

    if flags.contains(TermFlags::NON_IDX_SARG_COLL) {
        return (0, [lhs_seg, rhs_seg], flags);
    }

    let level = if is_equality(op) {
        flags |= TermFlags::EQUALITY_OP;
        1
    } else {
        2
    };
    if matches!(op, PtOp::IsIn) {
        flags |= TermFlags::RANGELIST;
    }
    (level, [lhs_seg, rhs_seg], flags)
}

fn as_name(node: &PtNode) -> Option<&crate::parse_tree::PtName> {
    match node {
        PtNode::Name(n) => Some(n),
        _ => None,
    }
}

fn resolve_seg_and_check_collation(env: &Env, name: &crate::parse_tree::PtName, flags: &mut TermFlags) -> Option<SegId> {
    let spec_id = name.spec_id?;
    let node_id = node_for_spec(env, spec_id)?;
    let seg_id = seg_for_name(env, node_id, name)?;
    if let Some(info) = &env.nodes[node_id].info {
        if let Some(attr) = info.attributes.iter().find(|a| a.name == name.name) {
            if !attr.is_index_sargable_collation {
                *flags |= TermFlags::NON_IDX_SARG_COLL;
            }
        }
    }
    Some(seg_id)
}

/// First-pass classification per the table in §3: location/arity driven,
/// ignorant of outer-join nullability (that refinement is
/// [`crate::outer_join::classify`]'s job).
fn classify(location: u32, nodes: &NodeSet, depends_on_numbering: bool, on_spec: Option<&PtSpec>, tail: Option<NodeId>, on_spec_node: Option<NodeId>) -> (TermClass, TermJoinType) {
    let arity = nodes.cardinality();
    if location == 0 {
        return match arity {
            0 if depends_on_numbering => (TermClass::TotallyAfterJoin, TermJoinType::NotApplicable),
            0 => (TermClass::Other, TermJoinType::NotApplicable),
            1 => (TermClass::Sarg, TermJoinType::NotApplicable),
            2 => (TermClass::Join, TermJoinType::Inner),
            _ => (TermClass::Other, TermJoinType::NotApplicable),
        };
    }

    // ON-condition.
    match arity {
        1 => {
            let on_right_outer = on_spec.is_some_and(|s| matches!(s.join_type, Some(JoinType::RightOuter)));
            if on_right_outer {
                (TermClass::DuringJoin, TermJoinType::NotApplicable)
            } else {
                (TermClass::Sarg, TermJoinType::NotApplicable)
            }
        }
        2 => {
            if tail == on_spec_node {
                let jt = match on_spec.and_then(|s| s.join_type) {
                    Some(JoinType::LeftOuter) => TermJoinType::LeftOuter,
                    Some(JoinType::RightOuter) => TermJoinType::RightOuter,
                    _ => TermJoinType::Inner,
                };
                (TermClass::Join, jt)
            } else {
                (TermClass::Other, TermJoinType::NotApplicable)
            }
        }
        _ => (TermClass::Other, TermJoinType::NotApplicable),
    }
}

#[tracing::instrument(skip_all)]
pub fn analyze_terms(e: &mut Env, stmt: &PtStatement) -> Result<()> {
    let specs = env::statement_specs(stmt);
    let mut conjuncts: Vec<(u32, PtExpr, Option<PtSpec>)> = Vec::new();

    for conjunct in env::statement_where_conjuncts(stmt) {
        conjuncts.push((0, conjunct, None));
    }
    for (ordinal, spec) in specs.iter().enumerate() {
        for conjunct in &spec.on_cond {
            conjuncts.push(((ordinal + 1) as u32, conjunct.clone(), Some(spec.clone())));
        }
    }

    for (location, mut expr, on_spec) in conjuncts {
        let depends_on_numbering = references_numbering(&expr);

        let mut collector = RefCollector {
            env: e,
            segs: Default::default(),
            nodes: Default::default(),
            subqueries: Default::default(),
        };
        collector.visit_expr(&expr);
        let (segs, nodes, subqueries) = (collector.segs, collector.nodes, collector.subqueries);

        let (can_use_index, index_segs, mut flags) = analyze_indexability(&mut expr, e, &nodes);
        if nodes.cardinality() == 1 {
            flags |= TermFlags::SINGLE_PRED;
        }
        if expr.info.transitive {
            flags |= TermFlags::TRANSITIVE;
        }

        let on_spec_node = on_spec.as_ref().and_then(|s| node_for_spec(e, s.id));
        let (mut head, mut tail) = (None, None);
        if nodes.cardinality() == 2 {
            let mut both = nodes.iter();
            let a = both.next().unwrap();
            let b = both.next().unwrap();
            let (lo, hi) = if a.index() < b.index() { (a, b) } else { (b, a) };
            head = Some(lo);
            tail = Some(hi);
        }

        let (class, join_type) = classify(location, &nodes, depends_on_numbering, on_spec.as_ref(), tail, on_spec_node);

        let selectivity = estimate_selectivity(can_use_index, flags);
        let rank = op_rank(expr.op) + subqueries.cardinality() as i32 * 8;

        let term_id: crate::graph::TermId = crate::arena::Id::new(e.terms.len() as u32);
        let term = Term {
            id: term_id,
            expr,
            location,
            class,
            join_type,
            segs,
            nodes,
            head,
            tail,
            selectivity,
            rank,
            can_use_index,
            index_segs,
            subqueries,
            flags,
            dep_set: Default::default(),
        };
        e.terms.push(term);
    }

    Ok(())
}

/// Placeholder selectivity model (§4.4: "computed from an external cost
/// estimator", which is out of scope for this crate). Equality keys are
/// assumed highly selective, ranges moderately so, everything else
/// unselective until the external estimator is wired in.
fn estimate_selectivity(can_use_index: u8, flags: TermFlags) -> f64 {
    match can_use_index {
        1 if flags.contains(TermFlags::EQUALITY_OP) => 0.1,
        1 | 2 => 0.3,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AttributeInfo, ClassInfo, ClassStatistics, SchemaCatalog};
    use crate::parse_tree::{ClassRef, PtExprInfo, PtName, PtQuery, PtSelect, PtSpec, PtValue, SpecEntity, SpecHint};
    use crate::value::DbValue;
    use std::sync::Arc;

    struct OneAttrCatalog;
    impl SchemaCatalog for OneAttrCatalog {
        fn class_info(&self, _class: &ClassRef) -> Option<ClassInfo> {
            Some(ClassInfo {
                heap_id: 1,
                attributes: vec![AttributeInfo {
                    id: 0,
                    name: "a".into(),
                    is_index_sargable_collation: true,
                    not_null: false,
                    has_server_default: false,
                }],
                stats: ClassStatistics {
                    row_count: 100.0,
                    page_count: 10.0,
                },
            })
        }
        fn class_constraints(&self, _class: &ClassRef) -> Vec<crate::catalog::IndexConstraint> {
            Vec::new()
        }
        fn attribute_statistics(&self, _class: &ClassRef, _attr: crate::catalog::AttrId) -> Option<crate::catalog::AttributeStatistics> {
            None
        }
    }

    fn eq_term(spec_id: u32) -> PtExpr {
        PtExpr {
            op: PtOp::Eq,
            arg1: Box::new(PtNode::Name(PtName {
                spec_id: Some(SpecId(spec_id)),
                name: "a".into(),
                is_oid: false,
            })),
            arg2: Some(Box::new(PtNode::Value(PtValue {
                value: DbValue::Int(1),
                is_pseudo_const: true,
            }))),
            arg3: None,
            or_next: None,
            info: PtExprInfo::default(),
        }
    }

    #[test]
    fn single_table_equality_becomes_sarg_with_index_level_one() {
        let catalog: Arc<dyn SchemaCatalog> = Arc::new(OneAttrCatalog);
        let spec = PtSpec {
            id: SpecId(0),
            range_var: "t".into(),
            entity: SpecEntity::Class(ClassRef { name: "t".into() }),
            join_type: None,
            on_cond: Vec::new(),
            referenced_attrs: vec!["a".into()],
            using_index: None,
            hint: SpecHint::default(),
        };
        let stmt = PtStatement::Query(PtQuery::Select(PtSelect {
            specs: vec![spec],
            where_conjuncts: vec![eq_term(0)],
            ..Default::default()
        }));

        let mut env = crate::graph_builder::build(catalog, crate::config::OptimizerParams::default(), &stmt).unwrap();
        let _ = &mut env;
        let (_, term) = env.terms.iter().next().unwrap();
        assert_eq!(term.class, TermClass::Sarg);
        assert_eq!(term.can_use_index, 1);
        assert!(term.flags.contains(TermFlags::EQUALITY_OP));
    }
}
