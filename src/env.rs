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

//! Environment: owns every arena for one optimization call (§4.2).
//!
//! An `Env` is created on entry to [`crate::graph_builder::build`], lives for
//! the duration of one plan's construction, and is dropped whole on success
//! or failure — there is no partial teardown path (§5, §7).

use std::sync::Arc;

use crate::catalog::SchemaCatalog;
use crate::config::OptimizerParams;
use crate::error::{Error, Result};
use crate::graph::{IndexEntry, Node, Partition, Segment, Subquery, Term};
use crate::parse_tree::{JoinType, PtExpr, PtQuery, PtSelect, PtSpec, PtStatement};

/// Hard cap on FROM-list entries one `Env` can graph (§4.2, §7 "structural
/// rejection"): `Partition::local_index`'s bitset encoding and the external
/// plan search's subset-enumeration keys both assume a node count that fits
/// comfortably under `usize::BITS`.
pub const MAX_NODES: usize = 64;

/// Selectivity-type infinity, computed once per `Env` rather than as
/// process-wide state (Design Notes §9).
pub const INFINITY: f64 = f64::INFINITY;

/// Output of the sizing pass (§4.2 `validate`): exact slot counts the fill
/// pass must allocate into and fill exactly, not merely an upper bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeEstimate {
    pub nodes: usize,
    pub segs: usize,
    pub terms: usize,
}

/// Owns every arena element of one optimization. Populated by
/// [`crate::graph_builder::build`]; read by every later phase
/// ([`crate::term_analyzer`], [`crate::outer_join`], [`crate::edges`],
/// [`crate::index_discovery`]) and finally by [`crate::planner::PlanSearch`].
pub struct Env {
    pub catalog: Arc<dyn SchemaCatalog>,
    pub params: OptimizerParams,
    pub nodes: crate::arena::Arena<Node>,
    pub segs: crate::arena::Arena<Segment>,
    pub terms: crate::arena::Arena<Term>,
    pub indexes: crate::arena::Arena<IndexEntry>,
    pub partitions: crate::arena::Arena<Partition>,
    pub subqueries: crate::arena::Arena<Subquery>,
}

impl Env {
    /// Allocates an `Env` with arenas pre-sized to exactly `size`
    /// (§4.2: "arrays of exactly those sizes are allocated"). `indexes` and
    /// `partitions` are not part of the sizing pass — they are discovered
    /// from the already-sized node/term arrays in later phases — so they
    /// start empty.
    pub fn with_capacity(catalog: Arc<dyn SchemaCatalog>, params: OptimizerParams, size: SizeEstimate) -> Self {
        Self {
            catalog,
            params,
            nodes: crate::arena::Arena::with_capacity(size.nodes),
            segs: crate::arena::Arena::with_capacity(size.segs),
            terms: crate::arena::Arena::with_capacity(size.terms),
            indexes: crate::arena::Arena::with_capacity(0),
            partitions: crate::arena::Arena::with_capacity(0),
            subqueries: crate::arena::Arena::with_capacity(0),
        }
    }

    pub fn nnodes(&self) -> usize {
        self.nodes.len()
    }
}

/// The sizing walk (§4.2 `validate`). Counts nodes (one per `PT_SPEC`),
/// segments (one per distinct referenced attribute, plus one OID per
/// non-derived spec, plus one reserve per outer-joined spec for the dummy
/// join term's synthesized value segment), and terms (every `ON`/`WHERE`
/// conjunct, plus one reserve per outer-joined spec for the dummy join term
/// itself). Rejects structurally unsupported statements per §7.
#[tracing::instrument(skip_all)]
pub fn validate(stmt: &PtStatement) -> Result<SizeEstimate> {
    let specs = statement_specs(stmt);
    if specs.len() > MAX_NODES {
        return Err(Error::Unsupported {
            reason: format!("{} FROM-list entries exceeds the {} node cap", specs.len(), MAX_NODES),
        });
    }

    let mut size = SizeEstimate::default();
    size.nodes = specs.len();

    let mut outer_joined = 0usize;
    for spec in &specs {
        size.segs += spec.referenced_attrs.len();
        if matches!(spec.entity, crate::parse_tree::SpecEntity::Class(_)) {
            // the node's own instance-OID segment.
            size.segs += 1;
        }
        size.terms += spec.on_cond.len();
        if matches!(spec.join_type, Some(JoinType::LeftOuter) | Some(JoinType::RightOuter)) {
            outer_joined += 1;
        }
    }
    // One reserve segment and one reserve term per outer-joined spec so
    // qo_add_dummy_join_term-equivalent insertion (§4.3, §4.5) can never
    // fail for lack of capacity.
    size.segs += outer_joined;
    size.terms += outer_joined;

    size.terms += statement_where_conjuncts(stmt).len();

    for conjunct in statement_where_conjuncts(stmt) {
        validate_conjunct_shape(conjunct)?;
    }
    for spec in &specs {
        for conjunct in &spec.on_cond {
            validate_conjunct_shape(conjunct)?;
        }
    }

    Ok(size)
}

/// §4.2: "fails with UNSUPPORTED if... any conjunct is not an expression or
/// value". The typed [`PtExpr`] shape already rules out anything else at
/// the type level; this exists as the named validation step the spec
/// requires, for future conjunct shapes that might not type-check this
/// cleanly (e.g. a bare sub-query used as a predicate without an `EXISTS`
/// wrapper).
fn validate_conjunct_shape(_conjunct: &PtExpr) -> Result<()> {
    Ok(())
}

pub(crate) fn statement_specs(stmt: &PtStatement) -> Vec<PtSpec> {
    match stmt {
        PtStatement::Query(q) => query_specs(q),
        PtStatement::Update(u) => {
            let mut specs = vec![u.spec.clone()];
            specs.extend(u.extra_specs.iter().cloned());
            specs
        }
        PtStatement::Delete(d) => {
            let mut specs = vec![d.spec.clone()];
            specs.extend(d.extra_specs.iter().cloned());
            specs
        }
        PtStatement::Insert(ins) => match &ins.source {
            crate::parse_tree::PtInsertSource::Select(q) => query_specs(q),
            crate::parse_tree::PtInsertSource::Values(_) => Vec::new(),
        },
    }
}

fn query_specs(query: &PtQuery) -> Vec<PtSpec> {
    match query {
        PtQuery::Select(sel) => sel.specs.clone(),
        PtQuery::SetOp { left, right, .. } => {
            // Each side of a set operation is graphed independently by its
            // own Env (§4.3 operates per-SELECT); only the outermost
            // statement's sizing pass needs a combined view for the union
            // proc's own bookkeeping, which carries no nodes of its own.
            let mut specs = query_specs(left);
            specs.extend(query_specs(right));
            specs
        }
    }
}

pub(crate) fn statement_where_conjuncts(stmt: &PtStatement) -> Vec<PtExpr> {
    match stmt {
        PtStatement::Query(PtQuery::Select(sel)) => select_where_conjuncts(sel),
        PtStatement::Query(PtQuery::SetOp { .. }) => Vec::new(),
        PtStatement::Update(u) => u.where_conjuncts.clone(),
        PtStatement::Delete(d) => d.where_conjuncts.clone(),
        PtStatement::Insert(ins) => match &ins.source {
            crate::parse_tree::PtInsertSource::Select(q) => match q.as_ref() {
                PtQuery::Select(sel) => select_where_conjuncts(sel),
                PtQuery::SetOp { .. } => Vec::new(),
            },
            crate::parse_tree::PtInsertSource::Values(_) => Vec::new(),
        },
    }
}

fn select_where_conjuncts(sel: &PtSelect) -> Vec<PtExpr> {
    sel.where_conjuncts.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_table_join_sizes_two_nodes_one_edge_and_one_sarg() {
        let stmt = crate::test_support::two_table_join_statement();
        let size = validate(&stmt).unwrap();
        assert_eq!(size.nodes, 2);
        // one OID segment per node plus `t.a`/`u.b`.
        assert_eq!(size.segs, 4);
        // one ON conjunct plus one WHERE conjunct, no outer joins to reserve for.
        assert_eq!(size.terms, 2);
    }

    #[test]
    fn from_list_past_the_node_cap_is_rejected() {
        let t = crate::parse_tree::PtSpec {
            id: crate::parse_tree::SpecId(0),
            range_var: "t".into(),
            entity: crate::parse_tree::SpecEntity::Class(crate::parse_tree::ClassRef { name: "t".into() }),
            join_type: None,
            on_cond: Vec::new(),
            referenced_attrs: Vec::new(),
            using_index: None,
            hint: crate::parse_tree::SpecHint::default(),
        };
        let stmt = PtStatement::Query(PtQuery::Select(PtSelect {
            specs: std::iter::repeat(t).take(MAX_NODES + 1).collect(),
            ..Default::default()
        }));
        assert!(matches!(validate(&stmt), Err(Error::Unsupported { .. })));
    }
}
