// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Sparse, slot-addressed owning container.
//!
//! Schema field numbers and repetition indices are small sparse integers, so
//! children are kept in a direct-addressed vector rather than a map. Iteration
//! order is slot order, which keeps re-serialization stable.
//!
//! # Invariants
//!
//! - [`size`](OwningIndex::size) is the smallest slot count covering every
//!   index ever set since the last [`clear`](OwningIndex::clear); gaps stay as
//!   empty slots and are never compacted.
//! - Each slot owns at most one value. [`set`](OwningIndex::set) hands the
//!   displaced value back to the caller, so an overwrite can neither leak nor
//!   leave two owners.
//! - Dropping the index drops the remaining values once each, in slot order.

/// Growable container owning at most one `T` per slot.
#[derive(Debug)]
pub struct OwningIndex<T> {
    slots: Vec<Option<T>>,
}

impl<T> OwningIndex<T> {
    /// Create an empty index.
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Observe the value at `index`, or `None` if the slot is empty or past
    /// the end.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Mutable access to the value at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Install `value` at `index`, growing with empty slots as needed.
    ///
    /// Returns the value previously owned by the slot.
    pub fn set(&mut self, index: usize, value: T) -> Option<T> {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index].replace(value)
    }

    /// Install `value` at `index` and return it, dropping any previous value.
    ///
    /// This is the in-place construction path used by `add_*` builders.
    pub fn emplace(&mut self, index: usize, value: T) -> &mut T {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index].insert(value)
    }

    /// Value at `index`, installing `make()` first if the slot is empty.
    pub fn get_or_insert_with(&mut self, index: usize, make: impl FnOnce() -> T) -> &mut T {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index].get_or_insert_with(make)
    }

    /// Append `value` in a new slot at `size()` and return its index.
    pub fn push(&mut self, value: T) -> usize {
        let index = self.slots.len();
        self.slots.push(Some(value));
        index
    }

    /// Remove and return the value at `index`. The slot itself is kept.
    pub fn take(&mut self, index: usize) -> Option<T> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Number of slots (one past the highest index ever set).
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Alias of [`size`](Self::size).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` when there are no slots at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots currently holding a value.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Drop every owned value and reset to zero slots.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (index, value)))
    }

    /// Occupied slots in slot order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|value| (index, value)))
    }
}

impl<T> Default for OwningIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for OwningIndex<T> {
    fn eq(&self, other: &Self) -> bool {
        self.slots == other.slots
    }
}
