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

//! Runtime value type threaded through regu-variables, the crate's analog of
//! `risingwave_common::types::ScalarImpl` (SPEC_FULL §4.9 ambient note): a
//! single, cheaply-cloned enum the evaluator can pattern-match on without
//! going back through the catalog's type descriptors.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::parse_tree::Oid;

#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Null,
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Decimal(Decimal),
    Varchar(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Oid(Oid),
}

impl DbValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DbValue::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            DbValue::Null => "null",
            DbValue::Bool(_) => "bool",
            DbValue::Int(_) => "int",
            DbValue::BigInt(_) => "bigint",
            DbValue::Double(_) => "double",
            DbValue::Decimal(_) => "decimal",
            DbValue::Varchar(_) => "varchar",
            DbValue::Date(_) => "date",
            DbValue::Timestamp(_) => "timestamp",
            DbValue::Oid(_) => "oid",
        }
    }

    /// Partial order used by key-range construction (§4.11): `Null` sorts
    /// below everything, mismatched variants are incomparable.
    pub fn partial_cmp_value(&self, other: &Self) -> Option<Ordering> {
        use DbValue::*;
        match (self, other) {
            (Null, Null) => Some(Ordering::Equal),
            (Null, _) => Some(Ordering::Less),
            (_, Null) => Some(Ordering::Greater),
            (Bool(a), Bool(b)) => a.partial_cmp(b),
            (Int(a), Int(b)) => a.partial_cmp(b),
            (BigInt(a), BigInt(b)) => a.partial_cmp(b),
            (Double(a), Double(b)) => a.partial_cmp(b),
            (Decimal(a), Decimal(b)) => a.partial_cmp(b),
            (Varchar(a), Varchar(b)) => a.partial_cmp(b),
            (Date(a), Date(b)) => a.partial_cmp(b),
            (Timestamp(a), Timestamp(b)) => a.partial_cmp(b),
            (Oid(a), Oid(b)) => (a.page, a.slot).partial_cmp(&(b.page, b.slot)),
            _ => None,
        }
    }
}

impl fmt::Display for DbValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbValue::Null => write!(f, "NULL"),
            DbValue::Bool(b) => write!(f, "{b}"),
            DbValue::Int(i) => write!(f, "{i}"),
            DbValue::BigInt(i) => write!(f, "{i}"),
            DbValue::Double(d) => write!(f, "{d}"),
            DbValue::Decimal(d) => write!(f, "{d}"),
            DbValue::Varchar(s) => write!(f, "{s:?}"),
            DbValue::Date(d) => write!(f, "{d}"),
            DbValue::Timestamp(t) => write!(f, "{t}"),
            DbValue::Oid(o) => write!(f, "oid({},{})", o.page, o.slot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sorts_below_every_other_variant() {
        assert_eq!(DbValue::Null.partial_cmp_value(&DbValue::Int(i32::MIN)), Some(Ordering::Less));
        assert_eq!(DbValue::Int(i32::MIN).partial_cmp_value(&DbValue::Null), Some(Ordering::Greater));
        assert_eq!(DbValue::Null.partial_cmp_value(&DbValue::Null), Some(Ordering::Equal));
    }

    #[test]
    fn mismatched_variants_are_incomparable() {
        assert_eq!(DbValue::Int(1).partial_cmp_value(&DbValue::Varchar("1".into())), None);
    }

    #[test]
    fn same_variant_compares_by_inner_value() {
        assert_eq!(DbValue::Int(1).partial_cmp_value(&DbValue::Int(2)), Some(Ordering::Less));
        assert_eq!(DbValue::Varchar("b".into()).partial_cmp_value(&DbValue::Varchar("a".into())), Some(Ordering::Greater));
    }

    #[test]
    fn type_name_identifies_every_variant() {
        assert_eq!(DbValue::Null.type_name(), "null");
        assert_eq!(DbValue::Int(0).type_name(), "int");
        assert!(!DbValue::Bool(true).is_null());
        assert!(DbValue::Null.is_null());
    }
}
