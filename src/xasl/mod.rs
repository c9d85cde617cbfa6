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

//! XASL proc assembly (§4.12): the top-level executable plan tree this
//! crate hands to the runtime engine, built from an [`Env`] plus a
//! [`crate::planner::ChosenPlan`].
//!
//! Every proc kind spec §4.12's table names is here: [`build_list`]'s
//! `BUILDLIST_PROC`/`BUILDVALUE_PROC` for SELECT shapes, [`setop`]'s
//! `UNION_PROC`/`DIFFERENCE_PROC`/`INTERSECTION_PROC` for set operations,
//! and [`dml`]'s `UPDATE_PROC`/`DELETE_PROC`/`INSERT_PROC`. [`sort`] and
//! [`aggregate`] hold the two leaf descriptor kinds every proc variant
//! shares.
//!
//! Like `risingwave_frontend`'s own protobuf plan-node tree
//! (`risingwave_pb::batch_plan::PlanNode`), this is a tagged, owned tree —
//! no back-pointers to the [`Env`] that produced it, since the `Env` (and
//! every regu-variable's `DbValue`, per §5) is dropped once lowering
//! finishes.

pub mod aggregate;
pub mod build_list;
pub mod dml;
pub mod setop;
pub mod sort;

use bitflags::bitflags;

use crate::catalog::HeapId;
use crate::parse_tree::{PtQuery, PtStatement};
use crate::planner::{ChosenPlan, PlanSearch};

pub use aggregate::AggregateDescriptor;
pub use build_list::{BuildListProc, BuildValueProc, GroupByClause};
pub use dml::{DeleteProc, InsertProc, InsertSource, UpdateProc};
pub use setop::SetOpProc;
pub use sort::SortSpec;

bitflags! {
    /// Per-proc flags the executor consults (spec §6's external-interface
    /// list, transcribed from `XASL_FLAG`): cache-invalidation and
    /// correlation-scope hints that don't belong on any one proc field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct XaslFlags: u32 {
        /// Set only on the outermost [`Xasl`] of one optimization; nested
        /// procs (subquery aptr/dptr, set-op children, the UPDATE/DELETE
        /// inner SELECT) never carry it.
        const TOP_MOST_XASL         = 0b0000_0000_0001;
        /// At least one regu-variable in this proc's tree is a
        /// `TYPE_CONSTANT` pointing into another proc's `val_list` (a join
        /// or correlated reference crossing a proc boundary).
        const LINK_TO_REGU_VARIABLE = 0b0000_0000_0010;
        /// No correlated subquery beneath this proc references an outer
        /// scope more than one level up — the common case, enabling a
        /// cheaper per-row re-evaluation path in the executor.
        const ZERO_CORR_LEVEL       = 0b0000_0000_0100;
        const TO_CATALOG_TABLE      = 0b0000_0000_1000;
        const TO_SHARD_TABLE        = 0b0000_0001_0000;
        /// This proc's `LIMIT` was fused into an access spec's key-limit
        /// (§4.11 `pt_instnum_to_key_limit`).
        const SORT_LIMIT_USED       = 0b0000_0010_0000;
        const SORT_LIMIT_CANDIDATE  = 0b0000_0100_0000;
        /// The chosen plan used the multi-range-scan optimization (§4.11).
        const MRO_IS_USED           = 0b0000_1000_0000;
        const MRO_CANDIDATE         = 0b0001_0000_0000;
        /// The chosen scan cannot use the buffer-fixed "fixed scan"
        /// executor fast path (e.g. it crosses a correlated boundary).
        const NO_FIXED_SCAN         = 0b0010_0000_0000;
    }
}

impl Default for XaslFlags {
    fn default() -> Self {
        XaslFlags::empty()
    }
}

/// One class this statement's top-most XASL reads or writes, recorded so
/// the executor's page-count-keyed cache invalidation (spec §6) has
/// something to key on without re-opening the catalog.
#[derive(Debug, Clone)]
pub struct ReferencedClass {
    pub class_name: String,
    pub heap_id: HeapId,
    pub page_count_estimate: f64,
}

/// One proc kind (spec §4.12's table). Boxed children keep the enum's own
/// size small even though [`UpdateProc`]/[`InsertProc`] nest a whole inner
/// `BUILDLIST_PROC`.
#[derive(Debug, Clone)]
pub enum XaslProc {
    BuildList(Box<BuildListProc>),
    BuildValue(Box<BuildValueProc>),
    Union(Box<SetOpProc>),
    Difference(Box<SetOpProc>),
    Intersection(Box<SetOpProc>),
    Update(Box<UpdateProc>),
    Delete(Box<DeleteProc>),
    Insert(Box<InsertProc>),
}

/// The top-most executable plan: one [`XaslProc`] plus the bookkeeping
/// spec §6 says only the top-most XASL carries (creator OID, referenced
/// classes, host-variable count, root output list).
#[derive(Debug, Clone)]
pub struct Xasl {
    pub flags: XaslFlags,
    pub proc: XaslProc,
    pub referenced_classes: Vec<ReferencedClass>,
    pub host_var_count: u32,
    /// The statement's final result projection — identical to the root
    /// proc's own `outptr_list` for a SELECT, or empty for UPDATE/DELETE
    /// (spec §6: "the root output list").
    pub root_outptr_list: Vec<crate::regu::ReguVar>,
}

/// Entry point: builds a fresh [`Env`](crate::env::Env) for `stmt` (and
/// recursively for every nested subquery/set-operation arm it contains),
/// asks `planner` for a [`ChosenPlan`] per partition, and lowers the result
/// into a complete [`Xasl`] tree (§2's whole pipeline, `Env init` through
/// `XASL tree`).
#[tracing::instrument(skip_all)]
pub fn assemble(
    catalog: std::sync::Arc<dyn crate::catalog::SchemaCatalog>,
    params: crate::config::OptimizerParams,
    stmt: &PtStatement,
    planner: &dyn PlanSearch,
) -> crate::error::Result<Xasl> {
    let mut symtab = crate::symbol_table::SymbolTable::default();
    let (proc, referenced_classes, host_var_count, root_outptr_list) = match stmt {
        PtStatement::Query(query) => {
            let mut refs = Vec::new();
            let mut hostvars = 0u32;
            let proc = build_list::build_query_proc(catalog, params, query, planner, &mut symtab, &mut refs, &mut hostvars)?;
            let root = build_list::root_outptr_of(&proc);
            (proc, refs, hostvars, root)
        }
        PtStatement::Update(_) => {
            let mut refs = Vec::new();
            let mut hostvars = 0u32;
            let proc = dml::build_update(catalog, params, stmt, planner, &mut symtab, &mut refs, &mut hostvars)?;
            (proc, refs, hostvars, Vec::new())
        }
        PtStatement::Delete(_) => {
            let mut refs = Vec::new();
            let mut hostvars = 0u32;
            let proc = dml::build_delete(catalog, params, stmt, planner, &mut symtab, &mut refs, &mut hostvars)?;
            (proc, refs, hostvars, Vec::new())
        }
        PtStatement::Insert(insert) => {
            let mut refs = Vec::new();
            let mut hostvars = 0u32;
            let proc = dml::build_insert(catalog, params, insert, planner, &mut symtab, &mut refs, &mut hostvars)?;
            (proc, refs, hostvars, Vec::new())
        }
    };

    let mut flags = XaslFlags::TOP_MOST_XASL | XaslFlags::ZERO_CORR_LEVEL;
    if proc_uses_cross_proc_link(&proc) {
        flags |= XaslFlags::LINK_TO_REGU_VARIABLE;
    }

    Ok(Xasl {
        flags,
        proc,
        referenced_classes,
        host_var_count,
        root_outptr_list,
    })
}

fn proc_uses_cross_proc_link(proc: &XaslProc) -> bool {
    matches!(proc, XaslProc::BuildList(b) if !b.aptr_list.is_empty() || !b.dptr_list.is_empty())
}
