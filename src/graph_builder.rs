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

//! Graph builder: the fill walk (§4.3) and the top-level pipeline that
//! chains every later phase (§2 overview) into one `Env`.

use std::sync::Arc;

use crate::catalog::SchemaCatalog;
use crate::config::OptimizerParams;
use crate::env::{self, Env};
use crate::error::Result;
use crate::graph::node::NodeJoinType;
use crate::graph::{Node, Segment};
use crate::parse_tree::{PtSpec, PtStatement, SpecEntity};
use crate::{edges, index_discovery, outer_join, term_analyzer};

/// Runs the whole pipeline in `§2`'s order: size → fill → term analysis →
/// outer-join classification → edge/partition discovery → index discovery.
/// The external plan search (`§4.7`'s planner, out of scope) takes the
/// returned `Env` from here.
#[tracing::instrument(skip_all)]
pub fn build(catalog: Arc<dyn SchemaCatalog>, params: OptimizerParams, stmt: &PtStatement) -> Result<Env> {
    let size = env::validate(stmt)?;
    let mut e = Env::with_capacity(catalog, params, size);

    fill(&mut e, stmt)?;
    term_analyzer::analyze_terms(&mut e, stmt)?;
    outer_join::classify(&mut e)?;
    edges::discover_edges(&mut e)?;
    edges::discover_partitions(&mut e)?;
    index_discovery::discover(&mut e)?;

    Ok(e)
}

/// The fill walk proper (§4.3 item 2): one node per spec, its OID segment,
/// and one segment per referenced attribute. Term construction happens in
/// [`crate::term_analyzer`], not here — the builder only ever knows about
/// nodes and segments.
fn fill(e: &mut Env, stmt: &PtStatement) -> Result<()> {
    let specs = env::statement_specs(stmt);
    for (ordinal, spec) in specs.iter().enumerate() {
        fill_node(e, spec, ordinal as u32)?;
    }
    Ok(())
}

fn fill_node(e: &mut Env, spec: &PtSpec, _ordinal: u32) -> Result<()> {
    let info = match &spec.entity {
        SpecEntity::Class(class_ref) => e.catalog.class_info(class_ref),
        SpecEntity::Derived(_) => None,
    };
    let (ncard, tcard) = info
        .as_ref()
        .map(|i| (i.stats.row_count, i.stats.page_count))
        .unwrap_or((1.0, 1.0));

    let node_id = e.nodes.push(Node {
        id: crate::arena::Id::new(e.nodes.len() as u32),
        spec_id: spec.id,
        range_var: spec.range_var.clone(),
        info,
        ncard,
        tcard,
        segs: Default::default(),
        sargs: Default::default(),
        dep_set: Default::default(),
        outer_dep_set: Default::default(),
        sargable: true,
        selectivity: 1.0,
        join_type: spec.join_type.map(NodeJoinType::from).unwrap_or(NodeJoinType::None),
        indexes: Vec::new(),
        using_index: spec.using_index.clone(),
        hint: spec.hint.clone(),
        oid_seg: None,
    });

    // The nullable side of an outer join cannot apply its own predicates as
    // scan sargs (§3 Node, §4.3's joint invariant with the classifier).
    if matches!(spec.join_type, Some(crate::parse_tree::JoinType::LeftOuter) | Some(crate::parse_tree::JoinType::RightOuter)) {
        e.nodes[node_id].sargable = false;
    }

    if matches!(spec.entity, SpecEntity::Class(_)) {
        let oid_id = e.segs.push(Segment {
            id: crate::arena::Id::new(e.segs.len() as u32),
            head: node_id,
            name: format!("{}.@oid", spec.range_var),
            is_oid: true,
            stats: None,
            index_terms: Default::default(),
        });
        e.nodes[node_id].segs.add(oid_id);
        e.nodes[node_id].oid_seg = Some(oid_id);
    }

    for attr in &spec.referenced_attrs {
        let stats = e.nodes[node_id]
            .info
            .as_ref()
            .and_then(|info| info.attributes.iter().find(|a| &a.name == attr))
            .and_then(|a| match &spec.entity {
                SpecEntity::Class(class_ref) => e.catalog.attribute_statistics(class_ref, a.id),
                SpecEntity::Derived(_) => None,
            });
        let seg_id = e.segs.push(Segment {
            id: crate::arena::Id::new(e.segs.len() as u32),
            head: node_id,
            name: attr.clone(),
            is_oid: false,
            stats,
            index_terms: Default::default(),
        });
        e.nodes[node_id].segs.add(seg_id);
    }

    Ok(())
}
