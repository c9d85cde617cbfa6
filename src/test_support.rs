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

//! Shared `#[cfg(test)]` fixtures: a two-table `t JOIN u ON t.a = u.b WHERE
//! t.a = 1` statement, with `t.a` indexed and `u.b` not, used by several
//! modules' unit tests to exercise more than one phase of the pipeline at
//! once (`edges`, `index_discovery`) without each re-deriving the same
//! catalog/parse-tree plumbing.

use std::sync::Arc;

use crate::catalog::{AttributeInfo, Btid, ClassInfo, ClassStatistics, ConstraintKind, IndexConstraint, SchemaCatalog};
use crate::parse_tree::{
    ClassRef, JoinType, PtExpr, PtExprInfo, PtName, PtNode, PtOp, PtQuery, PtSelect, PtSpec, PtStatement, PtValue, SpecEntity, SpecHint, SpecId,
};
use crate::value::DbValue;

pub struct TwoTableCatalog;

impl SchemaCatalog for TwoTableCatalog {
    fn class_info(&self, class: &ClassRef) -> Option<ClassInfo> {
        match class.name.as_str() {
            "t" => Some(ClassInfo {
                heap_id: 1,
                attributes: vec![AttributeInfo {
                    id: 0,
                    name: "a".into(),
                    is_index_sargable_collation: true,
                    not_null: false,
                    has_server_default: false,
                }],
                stats: ClassStatistics {
                    row_count: 1000.0,
                    page_count: 100.0,
                },
            }),
            "u" => Some(ClassInfo {
                heap_id: 2,
                attributes: vec![AttributeInfo {
                    id: 0,
                    name: "b".into(),
                    is_index_sargable_collation: true,
                    not_null: false,
                    has_server_default: false,
                }],
                stats: ClassStatistics {
                    row_count: 10.0,
                    page_count: 2.0,
                },
            }),
            _ => None,
        }
    }

    fn class_constraints(&self, class: &ClassRef) -> Vec<IndexConstraint> {
        match class.name.as_str() {
            "t" => vec![IndexConstraint {
                name: "idx_t_a".into(),
                btid: Btid {
                    volid: 0,
                    fileid: 1,
                    root_pageid: 2,
                },
                kind: ConstraintKind::Index,
                columns: vec![0],
                asc: vec![true],
            }],
            _ => Vec::new(),
        }
    }

    fn attribute_statistics(&self, _class: &ClassRef, _attr: crate::catalog::AttrId) -> Option<crate::catalog::AttributeStatistics> {
        None
    }
}

fn name(spec_id: u32, attr: &str) -> PtNode {
    PtNode::Name(PtName {
        spec_id: Some(SpecId(spec_id)),
        name: attr.into(),
        is_oid: false,
    })
}

fn int_value(v: i32) -> PtNode {
    PtNode::Value(PtValue {
        value: DbValue::Int(v),
        is_pseudo_const: true,
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

fn is_in(arg1: PtNode, values: Vec<i32>) -> PtExpr {
    PtExpr {
        op: PtOp::IsIn,
        arg1: Box::new(arg1),
        arg2: Some(Box::new(PtNode::List(values.into_iter().map(int_value).collect()))),
        arg3: None,
        or_next: None,
        info: PtExprInfo::default(),
    }
}

fn between(arg1: PtNode, lo: i32, hi: i32) -> PtExpr {
    PtExpr {
        op: PtOp::Between,
        arg1: Box::new(arg1),
        arg2: Some(Box::new(int_value(lo))),
        arg3: Some(Box::new(int_value(hi))),
        or_next: None,
        info: PtExprInfo::default(),
    }
}

fn single_table_t(where_conjuncts: Vec<PtExpr>) -> PtStatement {
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
    PtStatement::Query(PtQuery::Select(PtSelect {
        specs: vec![t],
        where_conjuncts,
        ..Default::default()
    }))
}

/// `SELECT * FROM t WHERE a = 1`.
pub fn single_table_eq_statement() -> PtStatement {
    single_table_t(vec![eq(name(0, "a"), int_value(1))])
}

/// `SELECT * FROM t WHERE a IN (1, 2, 3)`: `t.a` is indexed, so index
/// discovery binds the whole `IN`-list to that single column.
pub fn single_table_in_list_statement() -> PtStatement {
    single_table_t(vec![is_in(name(0, "a"), vec![1, 2, 3])])
}

/// `SELECT * FROM t WHERE a BETWEEN 1 AND 10`.
pub fn single_table_between_statement() -> PtStatement {
    single_table_t(vec![between(name(0, "a"), 1, 10)])
}

pub fn build_single_table_eq() -> crate::env::Env {
    crate::graph_builder::build(Arc::new(TwoTableCatalog) as Arc<dyn SchemaCatalog>, crate::config::OptimizerParams::default(), &single_table_eq_statement()).expect("fixture statement builds")
}

pub fn build_single_table_in_list() -> crate::env::Env {
    crate::graph_builder::build(Arc::new(TwoTableCatalog) as Arc<dyn SchemaCatalog>, crate::config::OptimizerParams::default(), &single_table_in_list_statement()).expect("fixture statement builds")
}

pub fn build_single_table_between() -> crate::env::Env {
    crate::graph_builder::build(Arc::new(TwoTableCatalog) as Arc<dyn SchemaCatalog>, crate::config::OptimizerParams::default(), &single_table_between_statement()).expect("fixture statement builds")
}

/// Builds a [`crate::symbol_table::SymbolTable`] with one frame declaring
/// every node in `e`, each with a holder for every segment it owns — the
/// same shape [`crate::xasl::build_list`] assembles before lowering a
/// node's access spec, minus the pop (callers own the frame's lifetime).
pub fn symtab_for(e: &crate::env::Env) -> crate::symbol_table::SymbolTable {
    let mut symtab = crate::symbol_table::SymbolTable::default();
    symtab.push_frame();
    for (node_id, node) in e.nodes.iter() {
        let mut info = crate::symbol_table::TableInfo {
            spec_id: node.spec_id,
            node: Some(node_id),
            holders: Vec::new(),
        };
        for seg_id in node.segs.iter() {
            let seg = &e.segs[seg_id];
            info.holder_or_insert(seg_id, &seg.name);
        }
        symtab.declare(info);
    }
    symtab
}

/// `SELECT * FROM t JOIN u ON t.a = u.b WHERE t.a = 1`: `t.a` is indexed,
/// `u.b` is not; the WHERE conjunct is a SARG on `t`, the ON conjunct is a
/// two-node JOIN edge.
pub fn two_table_join_statement() -> PtStatement {
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
        join_type: Some(JoinType::Inner),
        on_cond: vec![eq(name(0, "a"), name(1, "b"))],
        referenced_attrs: vec!["b".into()],
        using_index: None,
        hint: SpecHint::default(),
    };
    PtStatement::Query(PtQuery::Select(PtSelect {
        specs: vec![t, u],
        where_conjuncts: vec![eq(name(0, "a"), int_value(1))],
        ..Default::default()
    }))
}

pub fn build_two_table_join() -> crate::env::Env {
    crate::graph_builder::build(Arc::new(TwoTableCatalog) as Arc<dyn SchemaCatalog>, crate::config::OptimizerParams::default(), &two_table_join_statement()).expect("fixture statement builds")
}
