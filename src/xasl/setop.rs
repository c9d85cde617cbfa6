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

//! `UNION_PROC`/`DIFFERENCE_PROC`/`INTERSECTION_PROC` assembly (§4.12): the
//! set-operation arms of a `PtQuery::SetOp`, each lowered independently
//! (every arm gets its own [`crate::env::Env`], exactly like any other
//! `SELECT`) and joined under one [`SetOpProc`].

use std::sync::Arc;

use crate::catalog::SchemaCatalog;
use crate::config::OptimizerParams;
use crate::error::{Error, Result};
use crate::parse_tree::{PtQuery, SetOpKind};
use crate::planner::PlanSearch;
use crate::symbol_table::SymbolTable;
use crate::xasl::{build_list, ReferencedClass, XaslProc};

/// A `UNION`/`DIFFERENCE`/`INTERSECTION` of two already-lowered arms. Both
/// arms share the same output shape by construction (the binder that
/// produced the parse tree is responsible for that, not this crate); the
/// top-level `root_outptr_list` (§6) is taken from `left` only, since
/// `right`'s is structurally identical.
#[derive(Debug, Clone)]
pub struct SetOpProc {
    pub left: XaslProc,
    pub right: XaslProc,
    /// `UNION ALL` keeps duplicates; plain `UNION`/`DIFFERENCE`/
    /// `INTERSECTION` dedupe (`DISTINCT` is the SQL-standard default for
    /// all three, §2 pipeline's parse-tree input already carries this as
    /// the grammar's own default, not something this crate infers).
    pub all: bool,
}

/// Dispatches one `PtQuery::SetOp` arm to [`build_list::build_query_proc`]
/// recursively, then wraps the pair under the proc kind matching `kind`.
pub(crate) fn build_setop(
    catalog: Arc<dyn SchemaCatalog>,
    params: OptimizerParams,
    query: &PtQuery,
    planner: &dyn PlanSearch,
    symtab: &mut SymbolTable,
    refs: &mut Vec<ReferencedClass>,
    hostvars: &mut u32,
) -> Result<XaslProc> {
    let PtQuery::SetOp { kind, left, right, all } = query else {
        return Err(Error::Internal {
            msg: "build_setop called on a non-SetOp query".into(),
            file: file!(),
            line: line!(),
        });
    };

    let left_proc = build_list::build_query_proc(catalog.clone(), params.clone(), left, planner, symtab, refs, hostvars)?;
    let right_proc = build_list::build_query_proc(catalog, params, right, planner, symtab, refs, hostvars)?;

    let setop = Box::new(SetOpProc {
        left: left_proc,
        right: right_proc,
        all: *all,
    });

    Ok(match kind {
        SetOpKind::Union => XaslProc::Union(setop),
        SetOpKind::Difference => XaslProc::Difference(setop),
        SetOpKind::Intersection => XaslProc::Intersection(setop),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AttributeInfo, ClassInfo, ClassStatistics};
    use crate::parse_tree::{
        ClassRef, PtName, PtNode, PtQuery, PtSelect, PtSelectItem, PtSpec, PtStatement, SpecEntity, SpecHint, SpecId,
    };
    use crate::planner::ChosenPlan;
    use crate::xasl;

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
                stats: ClassStatistics { row_count: 10.0, page_count: 1.0 },
            })
        }
        fn class_constraints(&self, _class: &ClassRef) -> Vec<crate::catalog::IndexConstraint> {
            Vec::new()
        }
        fn attribute_statistics(&self, _class: &ClassRef, _attr: crate::catalog::AttrId) -> Option<crate::catalog::AttributeStatistics> {
            None
        }
    }

    struct SequentialFallback;
    impl PlanSearch for SequentialFallback {
        fn choose_plan(&self, e: &crate::env::Env, _partition: crate::graph::PartitionId) -> Result<ChosenPlan> {
            Ok(ChosenPlan::sequential_fallback(e))
        }
    }

    fn select_t(range_var: &str) -> PtSelect {
        PtSelect {
            specs: vec![PtSpec {
                id: SpecId(0),
                range_var: range_var.into(),
                entity: SpecEntity::Class(ClassRef { name: "t".into() }),
                join_type: None,
                on_cond: Vec::new(),
                referenced_attrs: vec!["a".into()],
                using_index: None,
                hint: SpecHint::default(),
            }],
            select_list: vec![PtSelectItem {
                expr: PtNode::Name(PtName { spec_id: Some(SpecId(0)), name: "a".into(), is_oid: false }),
                alias: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn union_wraps_both_arms_as_buildlist_procs() {
        let catalog: Arc<dyn SchemaCatalog> = Arc::new(OneAttrCatalog);
        let stmt = PtStatement::Query(PtQuery::SetOp {
            kind: SetOpKind::Union,
            left: Box::new(PtQuery::Select(select_t("t1"))),
            right: Box::new(PtQuery::Select(select_t("t2"))),
            all: false,
        });
        let xasl = xasl::assemble(catalog, OptimizerParams::default(), &stmt, &SequentialFallback).unwrap();
        match xasl.proc {
            XaslProc::Union(setop) => {
                assert!(matches!(setop.left, XaslProc::BuildList(_)));
                assert!(matches!(setop.right, XaslProc::BuildList(_)));
                assert!(!setop.all);
            }
            other => panic!("expected Union, got {other:?}"),
        }
    }
}
