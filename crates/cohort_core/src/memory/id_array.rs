//! # Id Array
//!
//! Growable, densely packed array of entity ids with a fill cursor.
//! Backing storage for subscriptions and iteration containers.

use crate::ecs::EntityId;

/// Growable id array.
///
/// Appends are amortized O(1) (geometric growth). Slots past the fill cursor
/// are never observable.
#[derive(Clone, Debug, Default)]
pub struct IdArray {
    ids: Vec<EntityId>,
}

impl IdArray {
    /// Creates an empty array.
    #[must_use]
    pub const fn new() -> Self {
        Self { ids: Vec::new() }
    }

    /// Creates an empty array with room for `capacity` ids.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
        }
    }

    /// Number of filled slots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if no slot is filled.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Appends an id at the fill cursor.
    #[inline]
    pub fn push(&mut self, id: EntityId) {
        self.ids.push(id);
    }

    /// Returns the last filled id.
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<EntityId> {
        self.ids.last().copied()
    }

    /// Removes the id at `index` by moving the trailing id into its slot.
    ///
    /// # Panics
    ///
    /// Panics if `index` is past the fill cursor.
    #[inline]
    pub fn swap_remove(&mut self, index: usize) -> EntityId {
        self.ids.swap_remove(index)
    }

    /// Keeps only the ids for which `keep` returns `true`, preserving the
    /// relative order of survivors. Single linear pass.
    ///
    /// Returns the number of removed ids.
    pub fn retain_stable<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(EntityId) -> bool,
    {
        let before = self.ids.len();
        self.ids.retain(|&id| keep(id));
        before - self.ids.len()
    }

    /// Moves the fill cursor back to `len`.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.ids.truncate(len);
    }

    /// Empties the array, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Filled slots.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[EntityId] {
        &self.ids
    }

    /// Filled slots, mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [EntityId] {
        &mut self.ids
    }

    /// Iterates over filled slots.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.ids.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> Vec<EntityId> {
        raw.iter().copied().map(EntityId::new).collect()
    }

    #[test]
    fn test_push_and_swap_remove() {
        let mut array = IdArray::with_capacity(4);
        for raw in [1, 2, 3, 4] {
            array.push(EntityId::new(raw));
        }

        assert_eq!(array.swap_remove(0), EntityId::new(1));
        assert_eq!(array.as_slice(), ids(&[4, 2, 3]).as_slice());
        assert_eq!(array.last(), Some(EntityId::new(3)));
    }

    #[test]
    fn test_retain_stable_preserves_order() {
        let mut array = IdArray::new();
        for raw in 1..=6 {
            array.push(EntityId::new(raw));
        }

        let removed = array.retain_stable(|id| id.index() % 2 == 1);
        assert_eq!(removed, 3);
        assert_eq!(array.as_slice(), ids(&[1, 3, 5]).as_slice());
    }
}
