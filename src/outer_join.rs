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

//! Outer-join classifier (§4.5): computes each node's outer-dependency
//! closure and reclassifies terms that sit on the nullable side of an outer
//! join, so later phases never need to re-derive outer-join semantics from
//! the raw parse tree.

use crate::env::Env;
use crate::error::Result;
use crate::graph::node::NodeJoinType;
use crate::graph::term::TermClass;
use crate::graph::{NodeId, NodeSet};

/// Seeds each node's immediate `outer_dep_set` from its join type: the
/// nullable side of an outer join depends on the preserved side joining
/// first (`qo_get_outer_dep_set`'s direct-predecessor case). This crate
/// only models the common left-deep chain shape the graph builder produces
/// (one FROM-list entry joins the one immediately before it); a
/// parenthesized join tree would need the original spec nesting, which
/// semantic analysis is expected to have already flattened per spec §1's
/// scope boundary.
fn seed_outer_dep_sets(e: &mut Env) {
    let order: Vec<NodeId> = e.nodes.ids().collect();
    for window in order.windows(2) {
        let (prev, cur) = (window[0], window[1]);
        match e.nodes[cur].join_type {
            NodeJoinType::LeftOuter => {
                e.nodes[cur].outer_dep_set.add(prev);
            }
            NodeJoinType::RightOuter => {
                e.nodes[prev].outer_dep_set.add(cur);
            }
            _ => {}
        }
    }
}

/// Transitive closure of `outer_dep_set` starting at `root`, written into
/// `node.dep_set` for every node (§4.5: "computes `dep_set` = transitive
/// closure of `outer_dep_set` rooted at the term's self node").
fn closure(e: &Env, root: NodeId) -> NodeSet {
    let mut seen: NodeSet = Default::default();
    let mut stack = vec![root];
    while let Some(n) = stack.pop() {
        for dep in e.nodes[n].outer_dep_set.iter() {
            if !seen.contains(dep) {
                seen.add(dep);
                stack.push(dep);
            }
        }
    }
    seen
}

#[tracing::instrument(skip_all)]
pub fn classify(e: &mut Env) -> Result<()> {
    seed_outer_dep_sets(e);

    let node_ids: Vec<NodeId> = e.nodes.ids().collect();
    for &n in &node_ids {
        let dep = closure(e, n);
        e.nodes[n].dep_set.union_with(&dep);
    }

    let term_ids: Vec<crate::graph::TermId> = e.terms.ids().collect();
    for term_id in term_ids {
        let nodes: Vec<NodeId> = e.terms[term_id].nodes.iter().collect();
        let mut dep: NodeSet = Default::default();
        for n in &nodes {
            dep.union_with(&e.nodes[*n].dep_set);
        }
        e.terms[term_id].dep_set = dep;

        reclassify(e, term_id);
    }

    Ok(())
}

/// The reclassification matrix proper (§4.5): promotes a WHERE SARG that
/// touches a non-sargable (outer-nullable) node to AFTER-JOIN, and an
/// apparently-disconnected, transitively-synthesized ON-conjunct to
/// DUMMY-JOIN once every node it touches is otherwise fully sargable.
fn reclassify(e: &mut Env, term_id: crate::graph::TermId) {
    let term = &e.terms[term_id];
    let location = term.location;
    let class = term.class;
    let flags = term.flags;
    let nodes: Vec<NodeId> = term.nodes.iter().collect();

    if location == 0 && class == TermClass::Sarg {
        if let Some(&n) = nodes.first() {
            if !e.nodes[n].sargable {
                e.terms[term_id].class = TermClass::AfterJoin;
            }
        }
        return;
    }

    if location > 0 && class == TermClass::Other && nodes.len() == 2 && flags.contains(crate::graph::term::TermFlags::TRANSITIVE) {
        let all_sargable = nodes.iter().all(|&n| e.nodes[n].sargable);
        if all_sargable {
            e.terms[term_id].class = TermClass::DummyJoin;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::SchemaCatalog;
    use crate::parse_tree::{ClassRef, JoinType, PtExpr, PtExprInfo, PtName, PtNode, PtOp, PtQuery, PtSelect, PtSpec, PtStatement, PtValue, SpecEntity, SpecHint, SpecId};
    use crate::test_support::TwoTableCatalog;
    use crate::value::DbValue;

    fn name(spec_id: u32, attr: &str) -> PtNode {
        PtNode::Name(PtName {
            spec_id: Some(SpecId(spec_id)),
            name: attr.into(),
            is_oid: false,
        })
    }

    fn eq(arg1: PtNode, arg2: PtNode) -> PtExpr {
        PtExpr {
            op: PtOp::Eq,
            arg1: Box::new(arg1),
            arg2: Some(Box::new(arg2)),
            arg3: None,
            or_next: None,
            info: PtExprInfo::default(),
        }
    }

    /// `SELECT * FROM t LEFT OUTER JOIN u ON t.a = u.b WHERE u.b = 5`
    /// (§8 scenario 4): `u` sits on the nullable side, so its own WHERE
    /// conjunct must become AFTER-JOIN rather than a scan SARG.
    fn left_outer_statement() -> PtStatement {
        let t = PtSpec {
            id: SpecId(0),
            range_var: "t".into(),
            entity: SpecEntity::Class(ClassRef { name: "t".into() }),
            join_type: None,
            on_cond: Vec::new(),
            referenced_attrs: vec!["a".into()],
            using_index: None,
            hint: SpecHint::default(),
        };
        let u = PtSpec {
            id: SpecId(1),
            range_var: "u".into(),
            entity: SpecEntity::Class(ClassRef { name: "u".into() }),
            join_type: Some(JoinType::LeftOuter),
            on_cond: vec![eq(name(0, "a"), name(1, "b"))],
            referenced_attrs: vec!["b".into()],
            using_index: None,
            hint: SpecHint::default(),
        };
        PtStatement::Query(PtQuery::Select(PtSelect {
            specs: vec![t, u],
            where_conjuncts: vec![eq(
                name(1, "b"),
                PtNode::Value(PtValue {
                    value: DbValue::Int(5),
                    is_pseudo_const: true,
                }),
            )],
            ..Default::default()
        }))
    }

    fn build(stmt: &PtStatement) -> Env {
        crate::graph_builder::build(Arc::new(TwoTableCatalog) as Arc<dyn SchemaCatalog>, crate::config::OptimizerParams::default(), stmt).expect("fixture statement builds")
    }

    #[test]
    fn nullable_side_of_left_outer_join_is_not_sargable() {
        let e = build(&left_outer_statement());
        let u = e.nodes.ids().nth(1).unwrap();
        assert!(!e.nodes[u].sargable);
    }

    #[test]
    fn where_sarg_on_nullable_side_is_reclassified_after_join() {
        let e = build(&left_outer_statement());
        let u = e.nodes.ids().nth(1).unwrap();
        // The WHERE conjunct on u.b must have been promoted off SARG once
        // classify() ran as part of graph_builder::build.
        let found = e
            .terms
            .iter()
            .find(|(_, t)| t.location == 0 && t.nodes.contains(u) && t.nodes.iter().count() == 1);
        let (_, term) = found.expect("the WHERE conjunct on u.b survives as a single-node term");
        assert_eq!(term.class, TermClass::AfterJoin);
    }

    #[test]
    fn join_term_endpoints_are_unaffected_by_reclassification() {
        let e = build(&left_outer_statement());
        let join_term = e.terms.iter().find(|(_, t)| t.class == TermClass::Join);
        let (_, term) = join_term.expect("the ON conjunct remains classified as JOIN");
        assert!(term.head.is_some());
        assert!(term.tail.is_some());
        assert!(term.head.unwrap().index() < term.tail.unwrap().index());
    }

    #[test]
    fn outer_dep_set_closure_reaches_the_preserved_side() {
        let e = build(&left_outer_statement());
        let t = e.nodes.ids().next().unwrap();
        let u = e.nodes.ids().nth(1).unwrap();
        assert!(e.nodes[u].dep_set.contains(t));
    }
}
