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

//! Index discovery (§4.7): binds each node's catalog constraints to
//! segments, records which terms drive each bound column, and determines
//! coverage.

use std::collections::HashMap;

use crate::arena::Id;
use crate::catalog::{ConstraintKind, IndexConstraint};
use crate::env::Env;
use crate::error::Result;
use crate::graph::index::IndexColumn;
use crate::graph::{IndexEntry, NodeId, SegId};
use crate::parse_tree::UsingIndexHint;

enum AllowedIndexes {
    All,
    None,
    /// Named constraints this node may consider; later `USING INDEX`
    /// mentions of the same name shadow earlier ones (§4.7).
    Named(HashMap<String, UsingIndexHint>),
}

fn allowed_indexes(hints: &Option<Vec<UsingIndexHint>>) -> AllowedIndexes {
    let Some(hints) = hints else {
        return AllowedIndexes::All;
    };
    if hints.iter().any(|h| h.index_name.is_none()) {
        return AllowedIndexes::None;
    }
    let mut named = HashMap::new();
    for hint in hints {
        if let Some(name) = &hint.index_name {
            named.insert(name.clone(), hint.clone());
        }
    }
    AllowedIndexes::Named(named)
}

fn seg_for_attr(e: &Env, node_id: NodeId, attr_name: &str) -> Option<SegId> {
    e.segs.iter().find(|(_, s)| s.head == node_id && !s.is_oid && s.name == attr_name).map(|(id, _)| id)
}

/// Binds a constraint's ordered attribute list to this node's segments,
/// stopping at the first attribute with no matching segment
/// (`qo_find_index_segs`). Returns `None` if not even the first column
/// binds.
fn bind_columns(e: &Env, node_id: NodeId, constraint: &IndexConstraint) -> Option<Vec<IndexColumn>> {
    let info = e.nodes[node_id].info.as_ref()?;
    let mut columns = Vec::new();
    for &attr_id in &constraint.columns {
        let Some(attr) = info.attributes.iter().find(|a| a.id == attr_id) else {
            break;
        };
        let Some(seg_id) = seg_for_attr(e, node_id, &attr.name) else {
            break;
        };
        columns.push(IndexColumn {
            seg: Some(seg_id),
            equal_terms: Default::default(),
            range_terms: Default::default(),
        });
    }
    if columns.is_empty() {
        None
    } else {
        Some(columns)
    }
}

/// Populates each bound column's `equal_terms`/`range_terms` from the
/// term analyzer's indexability output (`qo_find_index_seg_terms`) and
/// returns the union of every contributing term.
fn bind_terms(e: &Env, node_id: NodeId, columns: &mut [IndexColumn]) -> crate::graph::TermSet {
    let mut all_terms = crate::graph::TermSet::default();
    for (term_id, term) in e.terms.iter() {
        if term.nodes.cardinality() != 1 || !term.nodes.contains(node_id) || term.can_use_index == 0 {
            continue;
        }
        let bound_seg = term.index_segs[0];
        for col in columns.iter_mut() {
            if col.seg.is_some() && col.seg == bound_seg {
                if term.can_use_index == 1 {
                    col.equal_terms.add(term_id);
                } else {
                    col.range_terms.add(term_id);
                }
                all_terms.add(term_id);
            }
        }
    }
    all_terms
}

fn covers(e: &Env, node_id: NodeId, columns: &[IndexColumn]) -> bool {
    let node = &e.nodes[node_id];
    let mut bound: crate::graph::SegSet = Default::default();
    for col in columns {
        if let Some(seg) = col.seg {
            bound.add(seg);
        }
    }
    node.segs.iter().all(|seg| Some(seg) == node.oid_seg || bound.contains(seg))
}

#[tracing::instrument(skip_all)]
pub fn discover(e: &mut Env) -> Result<()> {
    let node_ids: Vec<NodeId> = e.nodes.ids().collect();
    for node_id in node_ids {
        let using_index = e.nodes[node_id].using_index.clone();
        let allowed = allowed_indexes(&using_index);

        let constraints = match &e.nodes[node_id].info {
            Some(info) => {
                let class_ref = crate::parse_tree::ClassRef {
                    name: format!("heap:{}", info.heap_id),
                };
                e.catalog.class_constraints(&class_ref)
            }
            None => continue,
        };

        for constraint in &constraints {
            let forced = match &allowed {
                AllowedIndexes::All => false,
                AllowedIndexes::None => {
                    if constraint.kind != ConstraintKind::PrimaryKey {
                        continue;
                    }
                    false
                }
                AllowedIndexes::Named(map) => match map.get(&constraint.name) {
                    Some(hint) => hint.force,
                    None => continue,
                },
            };

            let Some(mut columns) = bind_columns(e, node_id, constraint) else {
                continue;
            };
            let terms = bind_terms(e, node_id, &mut columns);
            let cover = covers(e, node_id, &columns);

            let index_id: crate::graph::IndexId = Id::new(e.indexes.len() as u32);
            e.indexes.push(IndexEntry {
                id: index_id,
                node: node_id,
                btid: constraint.btid,
                name: constraint.name.clone(),
                unique: matches!(constraint.kind, ConstraintKind::UniqueIndex | ConstraintKind::PrimaryKey),
                columns,
                terms,
                covers: cover,
                use_descending: false,
                orderby_skip: false,
                groupby_skip: false,
                forced,
            });
            e.nodes[node_id].indexes.push(index_id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_node_binds_its_equality_sarg() {
        let env = crate::test_support::build_two_table_join();
        let t = env.nodes.ids().next().unwrap();
        assert_eq!(env.nodes[t].indexes.len(), 1);
        let index = &env.indexes[env.nodes[t].indexes[0]];
        assert_eq!(index.columns.len(), 1);
        assert!(!index.columns[0].equal_terms.is_empty());
        assert!(index.columns[0].range_terms.is_empty());
    }

    #[test]
    fn unindexed_node_gets_no_index_entries() {
        let env = crate::test_support::build_two_table_join();
        let u = env.nodes.ids().nth(1).unwrap();
        assert!(env.nodes[u].indexes.is_empty());
    }

    #[test]
    fn covering_index_over_only_referenced_segment_sets_covers() {
        let env = crate::test_support::build_two_table_join();
        let t = env.nodes.ids().next().unwrap();
        // `t` only ever references `a` (plus its synthetic OID, excluded
        // from the coverage check); the sole index on `a` must cover it.
        let index = &env.indexes[env.nodes[t].indexes[0]];
        assert!(index.covers);
    }
}
