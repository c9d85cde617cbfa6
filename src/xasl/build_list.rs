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

//! `BUILDLIST_PROC`/`BUILDVALUE_PROC` assembly (§4.12): the two SELECT-shaped
//! proc kinds, chosen by whether the statement aggregates without a `GROUP
//! BY` (spec's table: "Aggregate with no `GROUP BY`" → `BUILDVALUE_PROC`,
//! "Otherwise SELECT" → `BUILDLIST_PROC`).

use std::sync::Arc;

use crate::access_spec::{self, AccessSpec, KeyLimit};
use crate::catalog::SchemaCatalog;
use crate::config::OptimizerParams;
use crate::env::Env;
use crate::error::Result;
use crate::graph::{NodeId, PartitionId};
use crate::parse_tree::{PtExpr, PtNode, PtOp, PtQuery, PtSelect, PtSelectItem, PtSpec, PtStatement};
use crate::planner::{AccessChoice, PlanSearch};
use crate::predicate::{PredExpr, PredicateBuilder};
use crate::regu::{Lowerer, ReguVar, ReguVarKind};
use crate::symbol_table::{SymbolTable, TableInfo, ValueHolder};
use crate::term_analyzer::references_op_in_tree;
use crate::xasl::aggregate::{lower_aggregate, AggregateDescriptor};
use crate::xasl::sort::{resolve_sort_list, SortSpec};
use crate::xasl::{setop, ReferencedClass, XaslProc};

/// One access spec in the join order, plus the `JOIN`-class predicate that
/// binds it to whatever precedes it (empty for the outermost/first scan).
/// Mirrors the executor's scan-ptr-linked `spec_list` chain (§4.12) without
/// an explicit `next` pointer, since `Vec` order already encodes it.
#[derive(Debug, Clone)]
pub struct ScanSpec {
    pub access: AccessSpec,
    pub join_pred: Option<PredExpr>,
}

#[derive(Debug, Clone)]
pub struct GroupByClause {
    /// Positional `GROUP BY` key, into the owning proc's `outptr_list`.
    pub key: Vec<SortSpec>,
    /// Output projection once rows are grouped (spec's `g_outptr`).
    pub g_outptr: Vec<ReguVar>,
    /// Group-key regu-vars evaluated per row to detect a group boundary
    /// (spec's `g_regu`).
    pub g_regu: Vec<ReguVar>,
    /// Holders caching the current group's key values (spec's `g_val`).
    pub g_val: Vec<ValueHolder>,
    pub g_having_pred: Option<PredExpr>,
    pub g_agg_list: Vec<AggregateDescriptor>,
    pub g_with_rollup: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BuildListProc {
    pub outptr_list: Vec<ReguVar>,
    pub val_list: Vec<ValueHolder>,
    pub spec_list: Vec<ScanSpec>,
    pub orderby_list: Vec<SortSpec>,
    pub instnum_pred: Option<PredExpr>,
    pub ordbynum_pred: Option<PredExpr>,
    /// Uncorrelated sub-queries, evaluated once and cached (§4.12 `aptr`).
    pub aptr_list: Vec<XaslProc>,
    /// Sub-queries correlated to this proc's own scope, re-evaluated per
    /// row (§4.12 `dptr`).
    pub dptr_list: Vec<XaslProc>,
    pub groupby_list: Option<GroupByClause>,
    pub limit_row_count: Option<ReguVar>,
    pub limit_offset: Option<ReguVar>,
    pub distinct: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BuildValueProc {
    pub spec_list: Vec<ScanSpec>,
    pub val_list: Vec<ValueHolder>,
    pub agg_list: Vec<AggregateDescriptor>,
    pub outptr_list: Vec<ReguVar>,
    pub having_pred: Option<PredExpr>,
    pub instnum_pred: Option<PredExpr>,
    pub aptr_list: Vec<XaslProc>,
    pub dptr_list: Vec<XaslProc>,
}

/// Dispatches a `PtQuery` to a `BUILDLIST`/`BUILDVALUE` proc or (for a set
/// operation) to [`setop::build_setop`]; used both for the statement's own
/// top-level query and, recursively, for every correlated/uncorrelated
/// sub-query and set-operation arm found beneath it.
pub(crate) fn build_query_proc(
    catalog: Arc<dyn SchemaCatalog>,
    params: OptimizerParams,
    query: &PtQuery,
    planner: &dyn PlanSearch,
    symtab: &mut SymbolTable,
    refs: &mut Vec<ReferencedClass>,
    hostvars: &mut u32,
) -> Result<XaslProc> {
    match query {
        PtQuery::Select(sel) => build_select(catalog, params, sel, planner, symtab, refs, hostvars),
        PtQuery::SetOp { .. } => setop::build_setop(catalog, params, query, planner, symtab, refs, hostvars),
    }
}

fn build_select(
    catalog: Arc<dyn SchemaCatalog>,
    params: OptimizerParams,
    sel: &PtSelect,
    planner: &dyn PlanSearch,
    symtab: &mut SymbolTable,
    refs: &mut Vec<ReferencedClass>,
    hostvars: &mut u32,
) -> Result<XaslProc> {
    let stmt = PtStatement::Query(PtQuery::Select(sel.clone()));
    let e = crate::graph_builder::build(catalog.clone(), params.clone(), &stmt)?;

    record_referenced_classes(&e, &sel.specs, refs);

    symtab.push_frame();
    let mut val_list = Vec::new();
    for (node_id, node) in e.nodes.iter() {
        let mut info = TableInfo {
            spec_id: node.spec_id,
            node: Some(node_id),
            holders: Vec::new(),
        };
        for seg_id in node.segs.iter() {
            let seg = &e.segs[seg_id];
            val_list.push(info.holder_or_insert(seg_id, &seg.name));
        }
        symtab.declare(info);
    }

    let result = build_select_body(&e, &catalog, &params, sel, planner, symtab, refs, hostvars, val_list);
    symtab.pop_frame();
    result
}

/// The rest of select-proc assembly, with the FROM-list's symbol frame
/// already pushed by the caller: split out so [`build_select`] has one
/// place to guarantee the frame is popped regardless of which branch below
/// returns.
#[allow(clippy::too_many_arguments)]
fn build_select_body(
    e: &Env,
    catalog: &Arc<dyn SchemaCatalog>,
    params: &OptimizerParams,
    sel: &PtSelect,
    planner: &dyn PlanSearch,
    symtab: &mut SymbolTable,
    refs: &mut Vec<ReferencedClass>,
    hostvars: &mut u32,
    val_list: Vec<ValueHolder>,
) -> Result<XaslProc> {
    let (mut scans, orderby_skip, groupby_skip, mro) = build_scan_chain(e, symtab, planner)?;

    let residual = collect_residual_terms(e);
    let (instnum_exprs, ordbynum_exprs, rest_exprs) = partition_residual(&residual);

    // Scoped so the shared `symtab` reborrows these hold are released
    // before `lower_subqueries` below needs it mutably.
    let (post_join_pred, mut instnum_pred, ordbynum_pred, key_limit) = {
        let lowerer = Lowerer::new(symtab);
        let pred_builder = PredicateBuilder::new(symtab);

        let post_join_pred = pred_builder.lower_conjuncts(&rest_exprs)?;
        let key_limit_candidate = scans.len() == 1 && post_join_pred.is_none() && scans[0].join_pred.is_none();

        let mut key_limit = None;
        if key_limit_candidate && !instnum_exprs.is_empty() {
            key_limit = numbering_exprs_to_key_limit(&lowerer, &instnum_exprs)?;
        }
        let instnum_pred = if key_limit.is_none() && !instnum_exprs.is_empty() {
            pred_builder.lower_conjuncts(&instnum_exprs)?
        } else {
            None
        };

        // Ordby-num-to-key-limit (§4.11): only applied when the plan search
        // chose a multi-range-optimization scan for this partition — only
        // such an access path can honor `ORDERBY_NUM()` as a precomputed
        // key-limit bound rather than a per-row filter.
        let mut ordbynum_pred = None;
        if key_limit_candidate && mro && !ordbynum_exprs.is_empty() {
            if let Some(ordbynum_limit) = numbering_exprs_to_key_limit(&lowerer, &ordbynum_exprs)? {
                key_limit = Some(match key_limit {
                    Some(existing) => fuse_two_key_limits(existing, ordbynum_limit),
                    None => ordbynum_limit,
                });
            } else {
                ordbynum_pred = pred_builder.lower_conjuncts(&ordbynum_exprs)?;
            }
        } else if !ordbynum_exprs.is_empty() {
            ordbynum_pred = pred_builder.lower_conjuncts(&ordbynum_exprs)?;
        }

        (post_join_pred, instnum_pred, ordbynum_pred, key_limit)
    };

    if let Some(limit) = key_limit {
        fuse_into_last_scan(&mut scans, limit);
    }
    if let Some(pred) = post_join_pred {
        attach_post_join_predicate(&mut scans, pred);
    }

    let (limit_row_count, limit_offset) = {
        let lowerer = Lowerer::new(symtab);
        lower_limit(&lowerer, sel.limit.as_ref())?
    };
    if orderby_skip && scans.len() == 1 {
        if let Some(limit) = limit_row_count.clone() {
            fuse_into_last_scan(&mut scans, KeyLimit { upper: limit, lower: limit_offset.clone() });
            // the key-limit now enforces the bound; no separate row filter left to apply
            instnum_pred = None;
        }
    }

    let (aptr_list, dptr_list) = lower_subqueries(e, catalog, params, symtab, planner, refs, hostvars)?;

    let has_agg = select_list_has_aggregate(&sel.select_list);
    let lowerer = Lowerer::new(symtab);
    let pred_builder = PredicateBuilder::new(symtab);

    if has_agg && sel.group_by.is_empty() {
        let mut agg_list = Vec::new();
        let mut outptr_list = Vec::new();
        for item in &sel.select_list {
            match &item.expr {
                PtNode::Agg(call) => {
                    let btid = aggregate_btree_optimization(e, call);
                    let agg = lower_aggregate(&lowerer, symtab, call, &sel.select_list, btid)?;
                    outptr_list.push(ReguVar { kind: ReguVarKind::Constant(agg.result.clone()) });
                    agg_list.push(agg);
                }
                other => outptr_list.push(lowerer.lower_node(other)?),
            }
        }
        let having_pred = sel.having.as_ref().map(|h| pred_builder.lower_conjuncts(std::slice::from_ref(h))).transpose()?.flatten();

        return Ok(XaslProc::BuildValue(Box::new(BuildValueProc {
            spec_list: scans,
            val_list,
            agg_list,
            outptr_list,
            having_pred,
            instnum_pred,
            aptr_list,
            dptr_list,
        })));
    }

    let outptr_list = sel
        .select_list
        .iter()
        .map(|item| lowerer.lower_node(&item.expr))
        .collect::<Result<Vec<_>>>()?;

    let orderby_list = if orderby_skip { Vec::new() } else { resolve_sort_list(&sel.select_list, &sel.order_by)? };

    let groupby_list = if sel.group_by.is_empty() {
        None
    } else {
        Some(build_groupby_clause(&lowerer, &pred_builder, symtab, e, sel, groupby_skip)?)
    };

    Ok(XaslProc::BuildList(Box::new(BuildListProc {
        outptr_list,
        val_list,
        spec_list: scans,
        orderby_list,
        instnum_pred,
        ordbynum_pred,
        aptr_list,
        dptr_list,
        groupby_list,
        limit_row_count,
        limit_offset,
        distinct: sel.distinct,
    })))
}

/// Records one [`ReferencedClass`] per base-class node, zipping `specs`
/// (the FROM-list this `Env`'s nodes were built from, in the same order,
/// §4.3) against `e.nodes` to recover the class name a [`Node`] itself
/// doesn't carry. Shared by `SELECT` (§4.12's own table) and, via
/// [`crate::xasl::dml`], `UPDATE`/`DELETE`'s target-plus-join specs.
pub(crate) fn record_referenced_classes(e: &Env, specs: &[PtSpec], refs: &mut Vec<ReferencedClass>) {
    for (spec, (_, node)) in specs.iter().zip(e.nodes.iter()) {
        if let crate::parse_tree::SpecEntity::Class(class_ref) = &spec.entity {
            if let Some(info) = &node.info {
                refs.push(ReferencedClass {
                    class_name: class_ref.name.clone(),
                    heap_id: info.heap_id,
                    page_count_estimate: node.tcard,
                });
            }
        }
    }
}

/// Builds one [`ScanSpec`] per node in every partition's chosen order,
/// concatenated in ascending [`PartitionId`] order (disconnected partitions
/// are unrelated sub-graphs — e.g. independent derived tables — and are
/// executed as a nested-loop cross product by the runtime, left to right).
/// Returns the combined `orderby_skip`/`groupby_skip`/`multi_range_optimization`
/// flags, true only when there is exactly one partition and its own plan set
/// them (§4.11's skip optimizations, and MRO eligibility, only make sense
/// for a single, wholly-ordered access path).
pub(crate) fn build_scan_chain(e: &Env, symtab: &SymbolTable, planner: &dyn PlanSearch) -> Result<(Vec<ScanSpec>, bool, bool, bool)> {
    if e.partitions.is_empty() {
        return Ok((Vec::new(), false, false, false));
    }

    let mut scans = Vec::new();
    let mut orderby_skip = false;
    let mut groupby_skip = false;
    let mut mro = false;
    let partition_ids: Vec<PartitionId> = e.partitions.ids().collect();

    for partition_id in &partition_ids {
        let plan = planner.choose_plan(e, *partition_id)?;
        if partition_ids.len() == 1 {
            orderby_skip = plan.orderby_skip;
            groupby_skip = plan.groupby_skip;
            mro = plan.multi_range_optimization;
        }
        for node_plan in &plan.order {
            let node_id = node_plan.node;
            let sarg_terms: Vec<_> = e.nodes[node_id].sargs.iter().chain(during_join_terms(e, node_id)).collect();

            let access = match node_plan.access {
                AccessChoice::Sequential => access_spec::build_sequential(e, symtab, node_id, &sarg_terms)?,
                AccessChoice::Index(index_id) => access_spec::build_index_scan(e, symtab, node_id, index_id, &sarg_terms)?,
            };

            let join_pred = lower_join_predicate(e, symtab, node_id)?;
            scans.push(ScanSpec { access, join_pred });
        }
    }

    Ok((scans, orderby_skip, groupby_skip, mro))
}

/// `ON`-clause single-node predicates on the nullable side of a `RIGHT
/// OUTER JOIN` (`TermClass::DuringJoin`, §3's classification table) are
/// folded into the owning node's own scan predicate alongside its SARGs:
/// this crate never executes the join itself, so there is no distinct
/// "null-padding step" to insert them into, only the predicate tree the
/// executor attaches to that node's scan.
fn during_join_terms(e: &Env, node_id: NodeId) -> Vec<crate::graph::TermId> {
    e.terms
        .iter()
        .filter(|(_, t)| t.class == crate::graph::term::TermClass::DuringJoin && t.nodes.cardinality() == 1 && t.nodes.contains(node_id))
        .map(|(id, _)| id)
        .collect()
}

/// The `JOIN`-class term(s) whose `tail` is `node_id` become that node's
/// join predicate, evaluated once the node's own scan has produced a row in
/// a left-deep plan (§3 Term: "head < tail" for every join term).
fn lower_join_predicate(e: &Env, symtab: &SymbolTable, node_id: NodeId) -> Result<Option<PredExpr>> {
    let exprs: Vec<PtExpr> = e
        .terms
        .iter()
        .filter(|(_, t)| t.class == crate::graph::term::TermClass::Join && t.tail == Some(node_id))
        .map(|(_, t)| t.expr.clone())
        .collect();
    if exprs.is_empty() {
        return Ok(None);
    }
    PredicateBuilder::new(symtab).lower_conjuncts(&exprs)
}

/// Terms this crate still owes a predicate evaluation somewhere but that
/// are neither a SARG, a DURING-JOIN, nor a JOIN edge already folded into
/// [`build_scan_chain`]'s per-node output: `AFTER_JOIN`/`TOTALLY_AFTER_JOIN`
/// residuals and zero-node `OTHER` conjuncts.
pub(crate) fn collect_residual_terms(e: &Env) -> Vec<PtExpr> {
    use crate::graph::term::TermClass;
    e.terms
        .iter()
        .filter(|(_, t)| matches!(t.class, TermClass::AfterJoin | TermClass::TotallyAfterJoin | TermClass::Other))
        .map(|(_, t)| t.expr.clone())
        .collect()
}

/// Splits the residual conjunct list into instance-numbering,
/// order-by-numbering, and ordinary predicates (§4.10's numbering flags;
/// §4.11's `pt_instnum_to_key_limit`/ordby-num-to-key-limit candidates).
pub(crate) fn partition_residual(residual: &[PtExpr]) -> (Vec<PtExpr>, Vec<PtExpr>, Vec<PtExpr>) {
    let mut instnum = Vec::new();
    let mut ordbynum = Vec::new();
    let mut rest = Vec::new();
    for expr in residual {
        if references_op_in_tree(expr, PtOp::InstNum) || references_op_in_tree(expr, PtOp::Rownum) {
            instnum.push(expr.clone());
        } else if references_op_in_tree(expr, PtOp::OrderbyNum) {
            ordbynum.push(expr.clone());
        } else {
            rest.push(expr.clone());
        }
    }
    (instnum, ordbynum, rest)
}

/// Recognizes the simple shapes `pt_instnum_to_key_limit`/ordby-num-to-
/// key-limit rewrite (§4.11): a single comparison of the numbering
/// pseudocolumn (`INST_NUM()`/`ROWNUM()`, or `ORDERBY_NUM()` under MRO)
/// against a constant upper bound (and optionally a second conjunct
/// providing a lower bound). Anything more elaborate (an `OR`-chain, a
/// non-comparison op) is left as a row filter.
fn numbering_exprs_to_key_limit(lowerer: &Lowerer<'_>, exprs: &[PtExpr]) -> Result<Option<KeyLimit>> {
    let mut upper = None;
    let mut lower = None;
    for expr in exprs {
        if expr.or_next.is_some() {
            return Ok(None);
        }
        let Some(bound) = expr.arg2.as_deref() else { return Ok(None) };
        let value = lowerer.lower_node(bound)?;
        match expr.op {
            PtOp::Lt | PtOp::Le => upper = Some(value),
            PtOp::Gt | PtOp::Ge => lower = Some(value),
            _ => return Ok(None),
        }
    }
    Ok(upper.map(|upper| KeyLimit { upper, lower }))
}

/// Combines an instnum-derived and an ordbynum-derived key-limit onto the
/// same scan (§4.11's `LEAST`-of-uppers/`GREATEST`-of-lowers fusion, the
/// same pattern [`crate::access_spec::fuse_key_limit`] uses for a query
/// `LIMIT` against a per-index key-limit hint).
fn fuse_two_key_limits(a: KeyLimit, b: KeyLimit) -> KeyLimit {
    let upper = ReguVar {
        kind: ReguVarKind::Func {
            name: "LEAST".into(),
            args: vec![a.upper, b.upper],
        },
    };
    let lower = match (a.lower, b.lower) {
        (Some(x), Some(y)) => Some(ReguVar {
            kind: ReguVarKind::Func {
                name: "GREATEST".into(),
                args: vec![x, y],
            },
        }),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    };
    KeyLimit { upper, lower }
}

fn fuse_into_last_scan(scans: &mut [ScanSpec], limit: KeyLimit) {
    if let Some(last) = scans.last_mut() {
        last.access.key_limit = Some(limit);
    }
}

/// Attaches the remaining post-join predicate to the last scan in the
/// chain: in a left-deep plan the final scan is the only point every
/// preceding node's `val_list` holder is already filled, so a predicate
/// spanning the whole join (an `AFTER_JOIN` term, or a disconnected `OTHER`
/// conjunct) can only be safely evaluated there.
pub(crate) fn attach_post_join_predicate(scans: &mut [ScanSpec], pred: PredExpr) {
    let Some(last) = scans.last_mut() else { return };
    last.access.predicate = Some(match last.access.predicate.take() {
        Some(existing) => PredExpr::And(Box::new(existing), Box::new(pred)),
        None => pred,
    });
}

fn select_list_has_aggregate(select_list: &[PtSelectItem]) -> bool {
    select_list.iter().any(|item| matches!(item.expr, PtNode::Agg(_)))
}

/// An aggregate over a `Name` bound to a node whose chosen access is an
/// index on that very column is answerable from the b-tree directly for
/// `MIN`/`MAX` (§8 scenario 5). `COUNT(*)`'s own optimization is flagged by
/// [`AggregateDescriptor::agg_optimize`] without needing a b-tree at all.
fn aggregate_btree_optimization(e: &Env, call: &crate::parse_tree::PtAggCall) -> Option<crate::catalog::Btid> {
    use crate::parse_tree::AggFunction;
    if !matches!(call.function, AggFunction::Min | AggFunction::Max) {
        return None;
    }
    let PtNode::Name(name) = call.arg.as_deref()? else { return None };
    let spec_id = name.spec_id?;
    let (_, node) = e.nodes.iter().find(|(_, n)| n.spec_id == spec_id)?;
    node.indexes.iter().find_map(|&idx_id| {
        let idx = &e.indexes[idx_id];
        idx.columns.first().and_then(|c| c.seg).filter(|&seg_id| e.segs[seg_id].name == name.name).map(|_| idx.btid)
    })
}

fn lower_limit(lowerer: &Lowerer<'_>, limit: Option<&crate::parse_tree::PtLimit>) -> Result<(Option<ReguVar>, Option<ReguVar>)> {
    match limit {
        None => Ok((None, None)),
        Some(l) => {
            let upper = lowerer.lower_node(&l.upper)?;
            let lower = l.lower.as_ref().map(|n| lowerer.lower_node(n)).transpose()?;
            Ok((Some(upper), lower))
        }
    }
}

fn build_groupby_clause(
    lowerer: &Lowerer<'_>,
    pred_builder: &PredicateBuilder<'_>,
    symtab: &SymbolTable,
    e: &Env,
    sel: &PtSelect,
    groupby_skip: bool,
) -> Result<GroupByClause> {
    let key = resolve_sort_list(&sel.select_list, &sel.group_by)?;

    let mut g_regu = Vec::new();
    let mut g_val = Vec::new();
    for spec in &sel.group_by {
        g_regu.push(lowerer.lower_node(&spec.expr)?);
        g_val.push(ValueHolder::new());
    }

    let mut g_agg_list = Vec::new();
    let mut g_outptr = Vec::new();
    let mut g_with_rollup = false;
    for item in &sel.select_list {
        match &item.expr {
            PtNode::Agg(call) => {
                let btid = aggregate_btree_optimization(e, call);
                let agg = lower_aggregate(lowerer, symtab, call, &sel.select_list, btid)?;
                g_with_rollup |= agg.with_rollup;
                g_outptr.push(ReguVar { kind: ReguVarKind::Constant(agg.result.clone()) });
                g_agg_list.push(agg);
            }
            other => g_outptr.push(lowerer.lower_node(other)?),
        }
    }

    let g_having_pred = sel.having.as_ref().map(|h| pred_builder.lower_conjuncts(std::slice::from_ref(h))).transpose()?.flatten();
    let _ = groupby_skip; // consulted by the executor's streaming-vs-sort choice, not the shape built here

    Ok(GroupByClause {
        key,
        g_outptr,
        g_regu,
        g_val,
        g_having_pred,
        g_agg_list,
        g_with_rollup,
    })
}

/// Lowers every [`crate::graph::Subquery`] this `Env` collected (§3's
/// Subquery descriptor) into its own nested proc, bucketed by
/// [`crate::graph::Subquery::is_correlated`] into `aptr`/`dptr` (§4.12).
#[allow(clippy::too_many_arguments)]
pub(crate) fn lower_subqueries(
    e: &Env,
    catalog: &Arc<dyn SchemaCatalog>,
    params: &OptimizerParams,
    symtab: &mut SymbolTable,
    planner: &dyn PlanSearch,
    refs: &mut Vec<ReferencedClass>,
    hostvars: &mut u32,
) -> Result<(Vec<XaslProc>, Vec<XaslProc>)> {
    let mut aptr = Vec::new();
    let mut dptr = Vec::new();
    for (_, sub) in e.subqueries.iter() {
        let proc = build_query_proc(catalog.clone(), params.clone(), &sub.query, planner, symtab, refs, hostvars)?;
        if sub.is_correlated() {
            dptr.push(proc);
        } else {
            aptr.push(proc);
        }
    }
    Ok((aptr, dptr))
}

/// The statement's root output list (spec §6): identical to a `BuildList`'s
/// `outptr_list`/a `BuildValue`'s `outptr_list`, or — for a set-operation
/// top proc — the left arm's, since both arms share the same output shape
/// by construction.
pub(crate) fn root_outptr_of(proc: &XaslProc) -> Vec<ReguVar> {
    match proc {
        XaslProc::BuildList(b) => b.outptr_list.clone(),
        XaslProc::BuildValue(b) => b.outptr_list.clone(),
        XaslProc::Union(s) | XaslProc::Difference(s) | XaslProc::Intersection(s) => root_outptr_of(&s.left),
        XaslProc::Update(_) | XaslProc::Delete(_) | XaslProc::Insert(_) => Vec::new(),
    }
}
