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

//! The typed input tree (spec §6, "Input: parse tree").
//!
//! The SQL lexer/grammar and semantic name/type resolution are out of scope
//! for this crate (spec §1): callers hand us an already-bound, already-typed
//! tree. These types exist only so the rest of the crate (and its tests) have
//! something concrete to consume; they are a minimal re-statement of the
//! `PT_SELECT`/`PT_SPEC`/`PT_NAME`/`PT_EXPR` shapes spec §6 names, not a
//! parser.

use crate::value::DbValue;

/// Back-reference from a [`PtName`] to the FROM-list entry ([`PtSpec`]) that
/// produces it. Stable within one statement; assigned by the semantic
/// resolution collaborator before this crate ever sees the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecId(pub u32);

/// A class/instance OID as produced by the schema catalog collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Oid {
    pub page: i32,
    pub slot: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    Cross,
}

/// One FROM-list entry.
#[derive(Debug, Clone)]
pub struct PtSpec {
    pub id: SpecId,
    pub range_var: String,
    pub entity: SpecEntity,
    /// `None` for the first (or comma-joined) spec; `Some` for an explicit
    /// `[INNER|LEFT OUTER|RIGHT OUTER|CROSS] JOIN`.
    pub join_type: Option<JoinType>,
    /// Conjuncts of this spec's `ON` clause (location = this spec's ordinal
    /// position in the FROM list, §3 Term).
    pub on_cond: Vec<PtExpr>,
    /// Attribute names semantic analysis determined are actually referenced
    /// anywhere in the statement (projection, predicates, grouping, ...).
    pub referenced_attrs: Vec<String>,
    /// `USING INDEX` hints, if any.
    pub using_index: Option<Vec<UsingIndexHint>>,
    pub hint: SpecHint,
}

#[derive(Debug, Clone, Default)]
pub struct SpecHint {
    pub ordered: bool,
    pub use_nl: bool,
    pub use_idx: bool,
}

#[derive(Debug, Clone)]
pub enum SpecEntity {
    /// A base class/table reference.
    Class(ClassRef),
    /// `FROM (SELECT ...) AS alias` or a correlated sub-query used as a
    /// table.
    Derived(Box<PtQuery>),
}

#[derive(Debug, Clone)]
pub struct ClassRef {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct UsingIndexHint {
    pub index_name: Option<String>,
    pub force: bool,
    pub key_limit: Option<PtNode>,
}

/// A name (column) reference.
#[derive(Debug, Clone)]
pub struct PtName {
    pub spec_id: Option<SpecId>,
    pub name: String,
    /// True for the synthetic/explicit instance-OID pseudocolumn.
    pub is_oid: bool,
}

#[derive(Debug, Clone)]
pub struct PtValue {
    pub value: DbValue,
    /// True for a pseudo-constant (host variable, literal) as opposed to a
    /// value that happens to fold to a constant; `pt_is_pseudo_const`.
    pub is_pseudo_const: bool,
}

/// A positional host variable (`?`).
#[derive(Debug, Clone)]
pub struct HostVarRef {
    pub position: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    NullSafeEq,
    Between,
    NotBetween,
    BetweenEqNa,
    Range,
    IsIn,
    IsNotIn,
    Like,
    NotLike,
    Rlike,
    NotRlike,
    IsNull,
    IsNotNull,
    Is,
    IsNot,
    Exists,
    And,
    Or,
    Not,
    Xor,
    Plus,
    Minus,
    Times,
    Divide,
    UnaryMinus,
    InstNum,
    Rownum,
    OrderbyNum,
    Case,
}

impl PtOp {
    /// The converse of a reversible comparison operator (`pt_converse_op`),
    /// used by the term analyzer (§4.4) to swap `const op attr` into
    /// `attr op const`.
    pub fn converse(self) -> Option<PtOp> {
        match self {
            PtOp::Eq => Some(PtOp::Eq),
            PtOp::Ne => Some(PtOp::Ne),
            PtOp::Lt => Some(PtOp::Gt),
            PtOp::Le => Some(PtOp::Ge),
            PtOp::Gt => Some(PtOp::Lt),
            PtOp::Ge => Some(PtOp::Le),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PtExprInfo {
    /// Flagged by the semantic/rewrite collaborator on synthesized
    /// equality-closure join edges (`PT_EXPR_INFO_TRANSITIVE`, §3
    /// supplement).
    pub transitive: bool,
}

/// A conjunct's expression tree. `or_next` threads a right-linear chain of
/// `OR`-ed disjuncts belonging to the same CNF conjunct (§4.10).
#[derive(Debug, Clone)]
pub struct PtExpr {
    pub op: PtOp,
    pub arg1: Box<PtNode>,
    pub arg2: Option<Box<PtNode>>,
    pub arg3: Option<Box<PtNode>>,
    pub or_next: Option<Box<PtExpr>>,
    pub info: PtExprInfo,
}

#[derive(Debug, Clone)]
pub struct PtFunctionCall {
    pub name: String,
    pub args: Vec<PtNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunction {
    CountStar,
    Count,
    Sum,
    Avg,
    Min,
    Max,
    GroupConcat,
}

#[derive(Debug, Clone)]
pub struct PtAggCall {
    pub function: AggFunction,
    pub arg: Option<Box<PtNode>>,
    pub distinct: bool,
    pub group_concat_separator: Option<String>,
    pub group_concat_order: Vec<PtSortSpec>,
    pub with_rollup: bool,
}

/// Any expression-position node: a name, a literal, a sub-expression, a
/// function call, an aggregate, a host variable, a literal value list (the
/// right-hand side of `IN (v1, v2, ...)`, CUBRID's `PT_RANGE`-normalized
/// `EQ_NA` list), or a sub-query used as a scalar ("unboxed as value") or as
/// a table ("unboxed as table", only valid directly under `IN`/`FROM`).
#[derive(Debug, Clone)]
pub enum PtNode {
    Name(PtName),
    Value(PtValue),
    Expr(Box<PtExpr>),
    Function(PtFunctionCall),
    Agg(Box<PtAggCall>),
    HostVar(HostVarRef),
    List(Vec<PtNode>),
    Query(Box<PtQuery>),
}

impl PtNode {
    pub fn as_expr(&self) -> Option<&PtExpr> {
        match self {
            PtNode::Expr(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PtSelectItem {
    pub expr: PtNode,
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PtSortSpec {
    /// The expression being sorted on; matched against the select list by
    /// equivalence, by alias, or (if `position` is set) by 1-based ordinal
    /// (§4.12).
    pub expr: PtNode,
    pub position: Option<u32>,
    pub asc: bool,
    pub nulls_first: bool,
}

#[derive(Debug, Clone)]
pub struct PtLimit {
    pub upper: PtNode,
    pub lower: Option<PtNode>,
}

#[derive(Debug, Clone, Default)]
pub struct PtSelect {
    pub specs: Vec<PtSpec>,
    pub select_list: Vec<PtSelectItem>,
    pub where_conjuncts: Vec<PtExpr>,
    pub group_by: Vec<PtSortSpec>,
    pub having: Option<PtExpr>,
    pub order_by: Vec<PtSortSpec>,
    pub limit: Option<PtLimit>,
    pub distinct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOpKind {
    Union,
    Difference,
    Intersection,
}

#[derive(Debug, Clone)]
pub enum PtQuery {
    Select(PtSelect),
    SetOp {
        kind: SetOpKind,
        left: Box<PtQuery>,
        right: Box<PtQuery>,
        all: bool,
    },
}

#[derive(Debug, Clone)]
pub struct PtAssignment {
    pub column: String,
    pub value: PtNode,
}

#[derive(Debug, Clone)]
pub struct PtUpdate {
    pub target: ClassRef,
    pub spec: PtSpec,
    pub extra_specs: Vec<PtSpec>,
    pub assignments: Vec<PtAssignment>,
    pub where_conjuncts: Vec<PtExpr>,
}

#[derive(Debug, Clone)]
pub struct PtDelete {
    pub target: ClassRef,
    pub spec: PtSpec,
    pub extra_specs: Vec<PtSpec>,
    pub where_conjuncts: Vec<PtExpr>,
}

/// One literal row of `INSERT ... VALUES (...), (...), ...`.
#[derive(Debug, Clone)]
pub struct PtValueRow {
    pub values: Vec<PtNode>,
}

#[derive(Debug, Clone)]
pub struct PtInsert {
    pub target: ClassRef,
    /// Column list as written (or the class's declared attribute order if
    /// omitted); attributes not present get their server-evaluated DEFAULT.
    pub columns: Vec<String>,
    pub source: PtInsertSource,
}

#[derive(Debug, Clone)]
pub enum PtInsertSource {
    Values(Vec<PtValueRow>),
    Select(Box<PtQuery>),
}

#[derive(Debug, Clone)]
pub enum PtStatement {
    Query(PtQuery),
    Update(PtUpdate),
    Delete(PtDelete),
    Insert(PtInsert),
}
