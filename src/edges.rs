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

//! Edge & partition discovery (§4.6): reorders the term arena exactly once
//! so edges precede non-edges and both regions sort by descending
//! selectivity, attaches SARGs to their owning node, then unions nodes into
//! partitions via the edges.
//!
//! Per Design Notes §9 and §5's ordering guarantee, [`discover_edges`] is
//! the *only* place in this crate that moves a [`crate::graph::TermId`]'s
//! backing storage; everything downstream holds term indices that are
//! stable from here on.

use petgraph::unionfind::UnionFind;

use crate::arena::Id;
use crate::env::Env;
use crate::error::Result;
use crate::graph::partition::MAX_PARTITION_NODES;
use crate::graph::term::TermClass;
use crate::graph::{NodeId, NodeSet, Partition, Term, TermSet};

fn is_edge(term: &Term) -> bool {
    term.class == TermClass::Join || term.nodes.cardinality() == 2
}

#[tracing::instrument(skip_all)]
pub fn discover_edges(e: &mut Env) -> Result<()> {
    let mut terms = e.terms.take();

    let (mut edges, mut rest): (Vec<Term>, Vec<Term>) = terms.drain(..).partition(is_edge);
    edges.sort_by(|a, b| b.selectivity.partial_cmp(&a.selectivity).unwrap_or(std::cmp::Ordering::Equal));
    rest.sort_by(|a, b| b.selectivity.partial_cmp(&a.selectivity).unwrap_or(std::cmp::Ordering::Equal));

    edges.append(&mut rest);
    for (i, term) in edges.iter_mut().enumerate() {
        term.id = Id::new(i as u32);
    }
    e.terms.restore(edges);

    for (term_id, term) in e.terms.iter().map(|(id, t)| (id, t.clone())).collect::<Vec<_>>() {
        crate::error::qo_assert!(
            term.class != TermClass::Join || (term.head.is_some() && term.tail.is_some()),
            "JOIN-class term {term_id:?} has a null endpoint"
        );

        if term.class == TermClass::Sarg {
            if let Some(node_id) = term.nodes.first() {
                e.nodes[node_id].sargs.add(term_id);
                let ncard = e.nodes[node_id].ncard.max(1.0);
                let floor = 1.0 / ncard;
                e.nodes[node_id].selectivity = (e.nodes[node_id].selectivity * term.selectivity).max(floor);
            }
        }
    }

    Ok(())
}

/// Classic union-find over node indices, unioning every node touched by the
/// same edge term (§4.6). Partitions are then assigned a dense,
/// partition-local node order so the external plan search can key a
/// subset-enumeration array by a `usize` bitmask (`Partition::local_index`).
#[tracing::instrument(skip_all)]
pub fn discover_partitions(e: &mut Env) -> Result<()> {
    let nnodes = e.nodes.len();
    if nnodes == 0 {
        return Ok(());
    }

    let mut uf = UnionFind::new(nnodes);
    let mut edge_terms_by_root: std::collections::HashMap<usize, TermSet> = std::collections::HashMap::new();

    for (term_id, term) in e.terms.iter() {
        if !is_edge(term) {
            continue;
        }
        let nodes: Vec<NodeId> = term.nodes.iter().collect();
        if let Some(&first) = nodes.first() {
            for &n in &nodes[1..] {
                uf.union(first.index(), n.index());
            }
        }
        for &n in &nodes {
            let root = uf.find(n.index());
            edge_terms_by_root.entry(root).or_default().add(term_id);
        }
    }

    let mut nodes_by_root: std::collections::HashMap<usize, Vec<NodeId>> = std::collections::HashMap::new();
    for node_id in e.nodes.ids() {
        let root = uf.find(node_id.index());
        nodes_by_root.entry(root).or_default().push(node_id);
    }

    let mut roots: Vec<usize> = nodes_by_root.keys().copied().collect();
    roots.sort_unstable();

    for root in roots {
        let node_order = nodes_by_root.remove(&root).unwrap_or_default();
        crate::error::qo_assert!(
            node_order.len() <= MAX_PARTITION_NODES,
            "partition with {} nodes exceeds the {} node limit",
            node_order.len(),
            MAX_PARTITION_NODES
        );

        let mut nodes: NodeSet = Default::default();
        for &n in &node_order {
            nodes.add(n);
        }
        let edges = edge_terms_by_root.remove(&root).unwrap_or_default();

        let mut dependencies: NodeSet = Default::default();
        for &n in &node_order {
            dependencies.union_with(&e.nodes[n].outer_dep_set);
        }
        dependencies.difference_with(&nodes);

        e.partitions.push(Partition {
            id: Id::new(e.partitions.len() as u32),
            nodes,
            edges,
            dependencies,
            node_order,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_edge_sorts_before_the_where_sarg() {
        let env = crate::test_support::build_two_table_join();
        // Exactly one JOIN edge (t.a = u.b) and one SARG (t.a = 1); the
        // edge must sit at index 0 after discover_edges's partition step.
        let (_, first) = env.terms.iter().next().expect("at least one term");
        assert_eq!(first.class, TermClass::Join);
        assert_eq!(first.head, env.nodes.ids().next());
    }

    #[test]
    fn sarg_is_attached_to_its_owning_nodes_bitset() {
        let env = crate::test_support::build_two_table_join();
        let t = env.nodes.ids().next().unwrap();
        let sarg = env
            .terms
            .iter()
            .find(|(_, t)| t.class == TermClass::Sarg)
            .map(|(id, _)| id)
            .expect("where conjunct classifies as sarg");
        assert!(env.nodes[t].sargs.contains(sarg));
    }

    #[test]
    fn single_partition_covers_both_joined_nodes() {
        let mut env = crate::test_support::build_two_table_join();
        env.partitions = Default::default();
        discover_partitions(&mut env).unwrap();
        assert_eq!(env.partitions.len(), 1);
        let (_, partition) = env.partitions.iter().next().unwrap();
        assert_eq!(partition.nodes.cardinality(), 2);
    }
}
