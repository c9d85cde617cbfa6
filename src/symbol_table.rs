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

//! Symbol table & table-info (§4.8): the contract between an access spec
//! and the regu-variable/predicate trees built on top of it.
//!
//! An access spec fills a [`ValueHolder`] per referenced attribute as it
//! scans; every `TYPE_CONSTANT` regu-var built over that spec points back
//! at the same holder rather than copying the value, so plan lowering
//! (§4.9-§4.11) never needs to know how a holder is filled, only which one
//! to read.

use std::cell::RefCell;
use std::rc::Rc;

use crate::graph::{NodeId, SegId};
use crate::parse_tree::SpecId;
use crate::value::DbValue;

/// A single attribute's value cell, shared (via `Rc`) between the access
/// spec that fills it each row and every regu-variable that reads it.
/// `RefCell` because the same holder is written once per row by the scan
/// and read arbitrarily many times by predicate/outptr evaluation within
/// that row — never concurrently (§5: single-threaded per optimization,
/// and the executor that eventually drives this holder is equally
/// single-threaded per scan).
#[derive(Debug, Clone)]
pub struct ValueHolder(Rc<RefCell<DbValue>>);

impl ValueHolder {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(DbValue::Null)))
    }

    pub fn get(&self) -> DbValue {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: DbValue) {
        *self.0.borrow_mut() = value;
    }
}

impl Default for ValueHolder {
    fn default() -> Self {
        Self::new()
    }
}

/// One FROM-spec's attribute value-holders, the `val_list` of §4.8. Keyed by
/// both the segment index (for bitset-driven lookups during plan lowering)
/// and the attribute name (for resolving a bare [`PtName`] during
/// regu-variable lowering, which only ever sees a name, not a segment id).
///
/// [`PtName`]: crate::parse_tree::PtName
#[derive(Debug, Clone, Default)]
pub struct TableInfo {
    pub spec_id: SpecId,
    pub node: Option<NodeId>,
    pub holders: Vec<(SegId, String, ValueHolder)>,
}

impl TableInfo {
    pub fn holder_for(&self, seg: SegId) -> Option<&ValueHolder> {
        self.holders.iter().find(|(s, _, _)| *s == seg).map(|(_, _, h)| h)
    }

    pub fn holder_for_name(&self, name: &str) -> Option<&ValueHolder> {
        self.holders.iter().find(|(_, n, _)| n == name).map(|(_, _, h)| h)
    }

    pub fn holder_or_insert(&mut self, seg: SegId, name: &str) -> ValueHolder {
        if let Some(h) = self.holder_for(seg) {
            return h.clone();
        }
        let holder = ValueHolder::new();
        self.holders.push((seg, name.to_string(), holder.clone()));
        holder
    }
}

/// A stack of symbol frames: the current query's `table_info`s on top, each
/// enclosing query's below it. Correlated attribute references resolve by
/// walking outward until the owning spec id is found (§4.8).
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    frames: Vec<Vec<TableInfo>>,
}

impl SymbolTable {
    pub fn push_frame(&mut self) {
        self.frames.push(Vec::new());
    }

    pub fn pop_frame(&mut self) -> Option<Vec<TableInfo>> {
        self.frames.pop()
    }

    pub fn declare(&mut self, info: TableInfo) {
        self.frames.last_mut().expect("push_frame before declare").push(info);
    }

    /// Finds the `TableInfo` for `spec_id`, searching the innermost frame
    /// first and widening outward — the correlation-resolution walk §4.8
    /// describes.
    pub fn resolve(&self, spec_id: SpecId) -> Option<(usize, &TableInfo)> {
        for (depth, frame) in self.frames.iter().rev().enumerate() {
            if let Some(info) = frame.iter().find(|t| t.spec_id == spec_id) {
                return Some((depth, info));
            }
        }
        None
    }

    pub fn resolve_mut(&mut self, spec_id: SpecId) -> Option<&mut TableInfo> {
        for frame in self.frames.iter_mut().rev() {
            if let Some(info) = frame.iter_mut().find(|t| t.spec_id == spec_id) {
                return Some(info);
            }
        }
        None
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
