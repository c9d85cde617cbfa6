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

//! Fixed-capacity bitsets over graph element indices (spec §4.1).
//!
//! All graph cross-references that are logically "a set of nodes/segments/
//! terms" (`node.segs`, `term.nodes`, `index.cover_segments`'s complement,
//! ...) are represented as one of these typed wrappers around
//! [`fixedbitset::FixedBitSet`] rather than a `Vec<Id<T>>`, so that union,
//! difference, intersects-test and cardinality are all O(words) as spec.md
//! requires. `fixedbitset` is the same crate `risingwave_frontend` uses for
//! `PlanRoot::out_fields`.

use std::marker::PhantomData;

use fixedbitset::FixedBitSet;

use crate::arena::Id;

/// A bitset over `Id<T>` values in `0..capacity`.
#[derive(Debug, Clone)]
pub struct TypedBitSet<T> {
    bits: FixedBitSet,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedBitSet<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bits: FixedBitSet::with_capacity(capacity),
            _marker: PhantomData,
        }
    }

    pub fn add(&mut self, id: Id<T>) {
        self.grow_for(id);
        self.bits.insert(id.index());
    }

    pub fn remove(&mut self, id: Id<T>) {
        if id.index() < self.bits.len() {
            self.bits.set(id.index(), false);
        }
    }

    pub fn contains(&self, id: Id<T>) -> bool {
        id.index() < self.bits.len() && self.bits.contains(id.index())
    }

    pub fn is_empty(&self) -> bool {
        self.bits.count_ones(..) == 0
    }

    pub fn cardinality(&self) -> usize {
        self.bits.count_ones(..)
    }

    pub fn clear(&mut self) {
        self.bits.clear();
    }

    pub fn union_with(&mut self, other: &Self) {
        self.grow_to(other.bits.len());
        self.bits.union_with(&other.bits);
    }

    pub fn difference_with(&mut self, other: &Self) {
        self.bits.difference_with(&other.bits);
    }

    pub fn intersect_with(&mut self, other: &Self) {
        self.bits.intersect_with(&other.bits);
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.bits.intersection(&other.bits).next().is_some()
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        self.bits.is_subset(&other.bits)
    }

    pub fn is_equivalent(&self, other: &Self) -> bool {
        // Two bitsets describe the same set of elements regardless of the
        // (possibly different) backing capacity allocated for each.
        self.iter().eq(other.iter())
    }

    pub fn first(&self) -> Option<Id<T>> {
        self.iter().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = Id<T>> + '_ {
        self.bits.ones().map(|i| Id::new(i as u32))
    }

    fn grow_for(&mut self, id: Id<T>) {
        self.grow_to(id.index() + 1);
    }

    fn grow_to(&mut self, min_len: usize) {
        if self.bits.len() < min_len {
            self.bits.grow(min_len);
        }
    }
}

impl<T> FromIterator<Id<T>> for TypedBitSet<T> {
    fn from_iter<I: IntoIterator<Item = Id<T>>>(iter: I) -> Self {
        let mut set = Self::with_capacity(0);
        for id in iter {
            set.add(id);
        }
        set
    }
}

impl<T> Default for TypedBitSet<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<T> PartialEq for TypedBitSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.is_equivalent(other)
    }
}
impl<T> Eq for TypedBitSet<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Elem;

    #[test]
    fn union_and_intersects() {
        let mut a: TypedBitSet<Elem> = TypedBitSet::with_capacity(4);
        let mut b: TypedBitSet<Elem> = TypedBitSet::with_capacity(4);
        a.add(Id::new(0));
        a.add(Id::new(1));
        b.add(Id::new(1));
        b.add(Id::new(2));
        assert!(a.intersects(&b));
        a.union_with(&b);
        assert_eq!(a.cardinality(), 3);
    }

    #[test]
    fn equivalent_ignores_backing_capacity() {
        let mut a: TypedBitSet<Elem> = TypedBitSet::with_capacity(2);
        let mut b: TypedBitSet<Elem> = TypedBitSet::with_capacity(64);
        a.add(Id::new(1));
        b.add(Id::new(1));
        assert!(a.is_equivalent(&b));
    }
}
