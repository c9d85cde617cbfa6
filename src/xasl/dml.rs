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

//! `UPDATE_PROC`/`DELETE_PROC`/`INSERT_PROC` assembly (§4.12).
//!
//! `UPDATE`/`DELETE` are both "a `BUILDLIST` over the target's scan, whose
//! output is a fixed `{class_oid, instance_oid, old-values, new-values}`
//! layout instead of an arbitrary select list" (§4.12); this module reuses
//! [`build_list`]'s scan-chain/predicate/subquery machinery and only
//! replaces the outptr-list shape and the proc wrapper. `INSERT` has no
//! scan at all for a `VALUES` source — its "access path" is the literal
//! rows themselves.

use std::sync::Arc;

use crate::catalog::{ClassInfo, HeapId, SchemaCatalog};
use crate::config::OptimizerParams;
use crate::error::{Error, Result};
use crate::parse_tree::{ClassRef, PtInsert, PtInsertSource, PtNode, PtOp, PtStatement};
use crate::planner::PlanSearch;
use crate::predicate::{CompareExpr, PredExpr, PredicateBuilder};
use crate::regu::{Lowerer, ReguVar, ReguVarKind};
use crate::symbol_table::{SymbolTable, TableInfo};
use crate::xasl::build_list::{self, BuildListProc};
use crate::xasl::{ReferencedClass, XaslProc};

#[derive(Debug, Clone)]
pub struct UpdateTarget {
    pub class_name: String,
    pub heap_id: HeapId,
    /// Assigned attribute names, in the same order as the `new_values`
    /// suffix of the inner [`BuildListProc`]'s `outptr_list`.
    pub attr_names: Vec<String>,
}

/// `UPDATE_PROC` (§4.12): the inner `aptr` is a `BUILDLIST` whose
/// `outptr_list` is exactly `{class_oid, instance_oid, old_values...,
/// new_values...}`; `constraint_pred` is the `IS NOT NULL`-per-`NOT NULL`-
/// attribute check, guarded by `OID IS NULL OR ...` when the target sits on
/// the nullable side of an outer join (§4.12).
#[derive(Debug, Clone)]
pub struct UpdateProc {
    pub aptr: Box<XaslProc>,
    pub target: UpdateTarget,
    pub constraint_pred: Option<PredExpr>,
}

#[derive(Debug, Clone)]
pub struct DeleteTarget {
    pub class_name: String,
    pub heap_id: HeapId,
}

/// `DELETE_PROC` (§4.12): the inner `aptr`'s `outptr_list` is
/// `{class_oid, instance_oid}` — enough for the executor to locate and
/// remove the instance, no old/new values needed.
#[derive(Debug, Clone)]
pub struct DeleteProc {
    pub aptr: Box<XaslProc>,
    pub target: DeleteTarget,
}

#[derive(Debug, Clone)]
pub enum InsertSource {
    /// One row per `VALUES (...)` literal, already permuted into
    /// `InsertProc::attr_names` order (§4.12).
    Values(Vec<Vec<ReguVar>>),
    /// `INSERT ... SELECT`: the inner `SELECT` proc supplies one row per
    /// iteration, in `InsertProc::attr_names` order.
    Select(Box<XaslProc>),
}

/// `INSERT_PROC` (§4.12).
#[derive(Debug, Clone)]
pub struct InsertProc {
    pub class_name: String,
    pub heap_id: HeapId,
    /// Final row-output order: attributes the catalog reports a
    /// server-evaluated `DEFAULT` for and that the statement didn't supply
    /// a value for come first, then the remaining declared attributes
    /// permuted from the insert's own column list into declared order
    /// (§4.12: "prefixed by attributes that have a server-evaluated
    /// DEFAULT expression").
    pub attr_names: Vec<String>,
    pub source: InsertSource,
}

fn class_info_or_err(catalog: &Arc<dyn SchemaCatalog>, class: &ClassRef) -> Result<ClassInfo> {
    catalog.class_info(class).ok_or_else(|| Error::Unsupported {
        reason: format!("no catalog entry for class `{}`", class.name),
    })
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn build_update(
    catalog: Arc<dyn SchemaCatalog>,
    params: OptimizerParams,
    stmt: &PtStatement,
    planner: &dyn PlanSearch,
    symtab: &mut SymbolTable,
    refs: &mut Vec<ReferencedClass>,
    hostvars: &mut u32,
) -> Result<XaslProc> {
    let PtStatement::Update(u) = stmt else {
        return Err(Error::Internal {
            msg: "build_update called on a non-Update statement".into(),
            file: file!(),
            line: line!(),
        });
    };

    let e = crate::graph_builder::build(catalog.clone(), params.clone(), stmt)?;

    let mut specs = vec![u.spec.clone()];
    specs.extend(u.extra_specs.iter().cloned());
    build_list::record_referenced_classes(&e, &specs, refs);

    symtab.push_frame();
    let mut val_list = Vec::new();
    for (node_id, node) in e.nodes.iter() {
        let mut info = TableInfo { spec_id: node.spec_id, node: Some(node_id), holders: Vec::new() };
        for seg_id in node.segs.iter() {
            let seg = &e.segs[seg_id];
            val_list.push(info.holder_or_insert(seg_id, &seg.name));
        }
        symtab.declare(info);
    }

    let result = (|| -> Result<XaslProc> {
        let (mut scans, _orderby_skip, _groupby_skip, _mro) = build_list::build_scan_chain(&e, symtab, planner)?;

        let residual = build_list::collect_residual_terms(&e);
        let (_instnum, _ordbynum, rest) = build_list::partition_residual(&residual);
        let post_join_pred = PredicateBuilder::new(symtab).lower_conjuncts(&rest)?;
        if let Some(pred) = post_join_pred {
            build_list::attach_post_join_predicate(&mut scans, pred);
        }

        let (aptr_list, dptr_list) = build_list::lower_subqueries(&e, &catalog, &params, symtab, planner, refs, hostvars)?;

        // The node built first (§4.3: one node per spec, in FROM-list
        // order) is always `u.spec` — the class this statement modifies.
        let (target_node, node) = e.nodes.iter().next().ok_or_else(|| Error::Internal {
            msg: "UPDATE produced an Env with no target node".into(),
            file: file!(),
            line: line!(),
        })?;
        let class_info = node.info.clone().ok_or_else(|| Error::Unsupported {
            reason: "UPDATE target must be a base class, not a derived table".into(),
        })?;

        let lowerer = Lowerer::new(symtab);
        let mut old_values = Vec::with_capacity(u.assignments.len());
        let mut new_values = Vec::with_capacity(u.assignments.len());
        for assign in &u.assignments {
            let old_name = PtNode::Name(crate::parse_tree::PtName {
                spec_id: Some(u.spec.id),
                name: assign.column.clone(),
                is_oid: false,
            });
            old_values.push(lowerer.lower_node(&old_name)?);
            new_values.push(lowerer.lower_node(&assign.value)?);
        }

        let mut constraint_terms = Vec::new();
        for (assign, new_val) in u.assignments.iter().zip(new_values.iter()) {
            let not_null = class_info.attributes.iter().any(|a| a.name == assign.column && a.not_null);
            if not_null {
                constraint_terms.push(PredExpr::Compare(CompareExpr {
                    op: PtOp::IsNotNull,
                    lhs: new_val.clone(),
                    rhs: None,
                    rhs2: None,
                }));
            }
        }
        let mut constraint_pred = constraint_terms.into_iter().reduce(|a, b| PredExpr::And(Box::new(a), Box::new(b)));
        if let Some(pred) = constraint_pred.take() {
            // `§3 Node.sargable == false` marks the nullable side of an
            // outer join; the constraint must not fire on a null-padded
            // row the join itself produced (§4.12).
            constraint_pred = Some(if !node.sargable {
                let oid_is_null = PredExpr::Compare(CompareExpr {
                    op: PtOp::IsNull,
                    lhs: ReguVar { kind: ReguVarKind::Oid(target_node) },
                    rhs: None,
                    rhs2: None,
                });
                PredExpr::Or(Box::new(oid_is_null), Box::new(pred))
            } else {
                pred
            });
        }

        let mut outptr_list = vec![
            class_oid_placeholder(class_info.heap_id),
            ReguVar { kind: ReguVarKind::Oid(target_node) },
        ];
        outptr_list.extend(old_values);
        outptr_list.extend(new_values);

        let aptr = XaslProc::BuildList(Box::new(BuildListProc {
            outptr_list,
            val_list,
            spec_list: scans,
            aptr_list,
            dptr_list,
            ..Default::default()
        }));

        Ok(XaslProc::Update(Box::new(UpdateProc {
            aptr: Box::new(aptr),
            target: UpdateTarget {
                class_name: u.target.name.clone(),
                heap_id: class_info.heap_id,
                attr_names: u.assignments.iter().map(|a| a.column.clone()).collect(),
            },
            constraint_pred,
        })))
    })();
    symtab.pop_frame();
    result
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn build_delete(
    catalog: Arc<dyn SchemaCatalog>,
    params: OptimizerParams,
    stmt: &PtStatement,
    planner: &dyn PlanSearch,
    symtab: &mut SymbolTable,
    refs: &mut Vec<ReferencedClass>,
    hostvars: &mut u32,
) -> Result<XaslProc> {
    let PtStatement::Delete(d) = stmt else {
        return Err(Error::Internal {
            msg: "build_delete called on a non-Delete statement".into(),
            file: file!(),
            line: line!(),
        });
    };

    let e = crate::graph_builder::build(catalog.clone(), params.clone(), stmt)?;

    let mut specs = vec![d.spec.clone()];
    specs.extend(d.extra_specs.iter().cloned());
    build_list::record_referenced_classes(&e, &specs, refs);

    symtab.push_frame();
    let mut val_list = Vec::new();
    for (node_id, node) in e.nodes.iter() {
        let mut info = TableInfo { spec_id: node.spec_id, node: Some(node_id), holders: Vec::new() };
        for seg_id in node.segs.iter() {
            let seg = &e.segs[seg_id];
            val_list.push(info.holder_or_insert(seg_id, &seg.name));
        }
        symtab.declare(info);
    }

    let result = (|| -> Result<XaslProc> {
        let (mut scans, _orderby_skip, _groupby_skip, _mro) = build_list::build_scan_chain(&e, symtab, planner)?;

        let residual = build_list::collect_residual_terms(&e);
        let (_instnum, _ordbynum, rest) = build_list::partition_residual(&residual);
        let post_join_pred = PredicateBuilder::new(symtab).lower_conjuncts(&rest)?;
        if let Some(pred) = post_join_pred {
            build_list::attach_post_join_predicate(&mut scans, pred);
        }

        let (aptr_list, dptr_list) = build_list::lower_subqueries(&e, &catalog, &params, symtab, planner, refs, hostvars)?;

        let (target_node, node) = e.nodes.iter().next().ok_or_else(|| Error::Internal {
            msg: "DELETE produced an Env with no target node".into(),
            file: file!(),
            line: line!(),
        })?;
        let class_info = node.info.clone().ok_or_else(|| Error::Unsupported {
            reason: "DELETE target must be a base class, not a derived table".into(),
        })?;

        let outptr_list = vec![
            class_oid_placeholder(class_info.heap_id),
            ReguVar { kind: ReguVarKind::Oid(target_node) },
        ];

        let aptr = XaslProc::BuildList(Box::new(BuildListProc {
            outptr_list,
            val_list,
            spec_list: scans,
            aptr_list,
            dptr_list,
            ..Default::default()
        }));

        Ok(XaslProc::Delete(Box::new(DeleteProc {
            aptr: Box::new(aptr),
            target: DeleteTarget {
                class_name: d.target.name.clone(),
                heap_id: class_info.heap_id,
            },
        })))
    })();
    symtab.pop_frame();
    result
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn build_insert(
    catalog: Arc<dyn SchemaCatalog>,
    params: OptimizerParams,
    insert: &PtInsert,
    planner: &dyn PlanSearch,
    symtab: &mut SymbolTable,
    refs: &mut Vec<ReferencedClass>,
    hostvars: &mut u32,
) -> Result<XaslProc> {
    let class_info = class_info_or_err(&catalog, &insert.target)?;
    refs.push(ReferencedClass {
        class_name: insert.target.name.clone(),
        heap_id: class_info.heap_id,
        page_count_estimate: class_info.stats.page_count,
    });

    match &insert.source {
        PtInsertSource::Values(rows) => {
            // Declared attributes the statement didn't give an explicit
            // value for but the catalog says default server-side: these
            // are the row's leading columns (§4.12).
            let explicit: Vec<&str> = insert.columns.iter().map(String::as_str).collect();
            let (defaulted, explicit_declared): (Vec<_>, Vec<_>) = class_info
                .attributes
                .iter()
                .partition(|a| !explicit.contains(&a.name.as_str()) && a.has_server_default);

            let mut attr_names: Vec<String> = defaulted.iter().map(|a| a.name.clone()).collect();
            attr_names.extend(explicit_declared.iter().map(|a| a.name.clone()));

            let lowerer = Lowerer::new(symtab);
            let mut out_rows = Vec::with_capacity(rows.len());
            for row in rows {
                if row.values.len() != insert.columns.len() {
                    return Err(Error::Unsupported {
                        reason: format!(
                            "VALUES row has {} entries but {} columns were named",
                            row.values.len(),
                            insert.columns.len()
                        ),
                    });
                }
                let mut out_row = Vec::with_capacity(attr_names.len());
                for _ in &defaulted {
                    out_row.push(ReguVar {
                        kind: ReguVarKind::Func { name: "DEFAULT".into(), args: Vec::new() },
                    });
                }
                for attr in &explicit_declared {
                    let value = match insert.columns.iter().position(|c| c == &attr.name) {
                        Some(pos) => lowerer.lower_node(&row.values[pos])?,
                        None => ReguVar { kind: ReguVarKind::DbVal(crate::value::DbValue::Null) },
                    };
                    out_row.push(value);
                }
                out_rows.push(out_row);
            }

            Ok(XaslProc::Insert(Box::new(InsertProc {
                class_name: insert.target.name.clone(),
                heap_id: class_info.heap_id,
                attr_names,
                source: InsertSource::Values(out_rows),
            })))
        }
        PtInsertSource::Select(query) => {
            let proc = build_list::build_query_proc(catalog, params, query, planner, symtab, refs, hostvars)?;
            let attr_names = if insert.columns.is_empty() {
                class_info.attributes.iter().map(|a| a.name.clone()).collect()
            } else {
                insert.columns.clone()
            };
            Ok(XaslProc::Insert(Box::new(InsertProc {
                class_name: insert.target.name.clone(),
                heap_id: class_info.heap_id,
                attr_names,
                source: InsertSource::Select(Box::new(proc)),
            })))
        }
    }
}

/// A placeholder `class_oid` slot: the real class OID is a runtime
/// catalog-lock artifact this crate never holds (§6's schema collaborator
/// owns it), so the position is reserved here and the executor substitutes
/// the actual OID at bind time, keyed by `heap_id`.
fn class_oid_placeholder(heap_id: HeapId) -> ReguVar {
    ReguVar {
        kind: ReguVarKind::Func {
            name: "CLASS_OID".into(),
            args: vec![ReguVar { kind: ReguVarKind::DbVal(crate::value::DbValue::BigInt(heap_id as i64)) }],
        },
    }
}
