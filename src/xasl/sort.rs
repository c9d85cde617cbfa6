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

//! Sort-list lowering (§4.12): `ORDER BY`/`GROUP BY` entries are positional,
//! each naming a 0-based slot of the proc's `outptr_list` rather than
//! re-lowering the sort expression. Position is discovered by matching the
//! sort expression against the select list, in the order spec §4.12 lists:
//! structural equivalence, alias, then explicit integer ordinal.

use crate::error::{Error, Result};
use crate::parse_tree::{PtExpr, PtName, PtNode, PtSelectItem, PtSortSpec};

/// One resolved `ORDER BY`/`GROUP BY` entry: a 0-based position into the
/// owning proc's `outptr_list`, plus direction and null ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub position: u32,
    pub asc: bool,
    pub nulls_first: bool,
}

pub fn resolve_sort_list(select_list: &[PtSelectItem], specs: &[PtSortSpec]) -> Result<Vec<SortSpec>> {
    specs.iter().map(|s| resolve_one(select_list, s)).collect()
}

fn resolve_one(select_list: &[PtSelectItem], spec: &PtSortSpec) -> Result<SortSpec> {
    let position = if let Some(ordinal) = spec.position {
        if ordinal == 0 || ordinal as usize > select_list.len() {
            return Err(Error::Unsupported {
                reason: format!("ORDER BY/GROUP BY position {ordinal} is out of range for a {}-column select list", select_list.len()),
            });
        }
        ordinal - 1
    } else if let Some(alias) = name_only_alias(&spec.expr) {
        find_by_alias(select_list, alias).ok_or_else(|| Error::Unsupported {
            reason: format!("ORDER BY/GROUP BY alias `{alias}` does not match any select-list item"),
        })?
    } else {
        find_by_equivalence(select_list, &spec.expr).ok_or_else(|| Error::Unsupported {
            reason: "ORDER BY/GROUP BY expression matches no select-list item by position, alias, or equivalence".into(),
        })?
    };

    Ok(SortSpec {
        position,
        asc: spec.asc,
        nulls_first: spec.nulls_first,
    })
}

/// A bare `PT_NAME` used as a sort key is first tried against select-list
/// aliases (`ORDER BY total` matching `SELECT sum(x) AS total`) before
/// falling back to full structural equivalence, since a bare name rarely
/// also happens to equal a select-list expression verbatim.
fn name_only_alias(node: &PtNode) -> Option<&str> {
    match node {
        PtNode::Name(PtName { name, .. }) => Some(name.as_str()),
        _ => None,
    }
}

fn find_by_alias(select_list: &[PtSelectItem], alias: &str) -> Option<u32> {
    select_list.iter().position(|item| item.alias.as_deref() == Some(alias)).map(|p| p as u32)
}

fn find_by_equivalence(select_list: &[PtSelectItem], expr: &PtNode) -> Option<u32> {
    select_list.iter().position(|item| pt_node_equivalent(&item.expr, expr)).map(|p| p as u32)
}

/// Structural equivalence of two expression-position nodes, ignoring
/// `spec_id`'s exact binding only where the name string and OID-ness agree
/// (matching a sort expression against a select-list item requires the same
/// column written twice, not two `PtName`s that happen to resolve the same
/// way through different spellings).
pub fn pt_node_equivalent(a: &PtNode, b: &PtNode) -> bool {
    match (a, b) {
        (PtNode::Name(a), PtNode::Name(b)) => a.spec_id == b.spec_id && a.name == b.name && a.is_oid == b.is_oid,
        (PtNode::Value(a), PtNode::Value(b)) => a.value == b.value,
        (PtNode::Expr(a), PtNode::Expr(b)) => pt_expr_equivalent(a, b),
        (PtNode::Function(a), PtNode::Function(b)) => {
            a.name == b.name && a.args.len() == b.args.len() && a.args.iter().zip(&b.args).all(|(x, y)| pt_node_equivalent(x, y))
        }
        (PtNode::HostVar(a), PtNode::HostVar(b)) => a.position == b.position,
        _ => false,
    }
}

fn pt_expr_equivalent(a: &PtExpr, b: &PtExpr) -> bool {
    a.op == b.op
        && pt_node_equivalent(&a.arg1, &b.arg1)
        && opt_equivalent(a.arg2.as_deref(), b.arg2.as_deref())
        && opt_equivalent(a.arg3.as_deref(), b.arg3.as_deref())
}

fn opt_equivalent(a: Option<&PtNode>, b: Option<&PtNode>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => pt_node_equivalent(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_tree::SpecId;
    use crate::value::DbValue;

    fn name(spec: u32, n: &str) -> PtNode {
        PtNode::Name(PtName {
            spec_id: Some(SpecId(spec)),
            name: n.into(),
            is_oid: false,
        })
    }

    fn item(expr: PtNode, alias: Option<&str>) -> PtSelectItem {
        PtSelectItem { expr, alias: alias.map(String::from) }
    }

    #[test]
    fn resolves_by_explicit_position() {
        let select_list = vec![item(name(0, "a"), None), item(name(0, "b"), None)];
        let spec = PtSortSpec {
            expr: PtNode::Value(crate::parse_tree::PtValue { value: DbValue::Int(2), is_pseudo_const: true }),
            position: Some(2),
            asc: true,
            nulls_first: true,
        };
        let resolved = resolve_sort_list(&select_list, std::slice::from_ref(&spec)).unwrap();
        assert_eq!(resolved[0].position, 1);
    }

    #[test]
    fn resolves_by_alias_before_equivalence() {
        let select_list = vec![item(name(0, "x"), Some("total"))];
        let spec = PtSortSpec {
            expr: name(0, "total"),
            position: None,
            asc: false,
            nulls_first: false,
        };
        let resolved = resolve_sort_list(&select_list, std::slice::from_ref(&spec)).unwrap();
        assert_eq!(resolved[0].position, 0);
        assert!(!resolved[0].asc);
    }

    #[test]
    fn resolves_by_structural_equivalence() {
        let select_list = vec![item(name(0, "a"), None)];
        let spec = PtSortSpec {
            expr: name(0, "a"),
            position: None,
            asc: true,
            nulls_first: false,
        };
        let resolved = resolve_sort_list(&select_list, std::slice::from_ref(&spec)).unwrap();
        assert_eq!(resolved[0].position, 0);
    }

    #[test]
    fn rejects_position_out_of_range() {
        let select_list = vec![item(name(0, "a"), None)];
        let spec = PtSortSpec {
            expr: name(0, "a"),
            position: Some(5),
            asc: true,
            nulls_first: false,
        };
        assert!(resolve_sort_list(&select_list, std::slice::from_ref(&spec)).is_err());
    }
}
