//! # Entity Management
//!
//! Entities are plain dense indices. There is no entity object: identity and
//! liveness live entirely in id-indexed storage.
//!
//! Ids are recycled through a free list. A recycled id may alias a different
//! logical entity, so ids must never be held across steps.

use crate::memory::BitVector;
use std::fmt;

/// Dense, non-negative entity identifier.
///
/// Index `0` is reserved as [`EntityId::SENTINEL`] and is never handed out
/// by an [`EntityAllocator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Reserved id matched by simple aspects (systems with no per-entity
    /// interest, run exactly once per step).
    pub const SENTINEL: Self = Self(0);

    /// Creates an entity ID from a raw index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Returns the index as a `usize`, for id-indexed storage.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> usize {
        self.0 as usize
    }

    /// Checks if this is the sentinel id.
    #[inline]
    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out dense entity ids and tracks liveness.
///
/// Despawned ids are parked until [`EntityAllocator::release_pending`] runs at
/// the end of a step, so an id is never reused inside the step it died in.
#[derive(Debug)]
pub struct EntityAllocator {
    /// Liveness, indexed by id.
    alive: BitVector,
    /// Ids ready for reuse.
    free_indices: Vec<u32>,
    /// Ids despawned this step, not yet reusable.
    pending_free: Vec<u32>,
    /// Next never-used index.
    next_index: u32,
    /// Number of currently alive entities.
    alive_count: usize,
}

impl EntityAllocator {
    /// Creates an allocator pre-sized for `capacity` ids.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            alive: BitVector::with_capacity(capacity),
            free_indices: Vec::with_capacity(capacity),
            pending_free: Vec::new(),
            // 0 is the sentinel
            next_index: 1,
            alive_count: 0,
        }
    }

    /// Returns the number of currently alive entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// One past the highest id ever handed out.
    #[inline]
    #[must_use]
    pub const fn high_water_mark(&self) -> usize {
        self.next_index as usize
    }

    /// Allocates an id, reusing a released one when available.
    ///
    /// # Panics
    ///
    /// Panics if the id space (`u32::MAX` entities) is exhausted.
    pub fn spawn(&mut self) -> EntityId {
        let index = if let Some(index) = self.free_indices.pop() {
            index
        } else {
            let index = self.next_index;
            self.next_index = index.checked_add(1).expect("entity id space exhausted");
            index
        };

        self.alive.insert(index as usize);
        self.alive_count += 1;
        EntityId::new(index)
    }

    /// Marks an id dead. Returns `false` if it was not alive.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if !self.alive.remove(id.slot()) {
            return false;
        }
        self.alive_count -= 1;
        self.pending_free.push(id.index());
        true
    }

    /// Checks if an entity is alive. The sentinel is never alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.contains(id.slot())
    }

    /// Makes ids despawned since the last call available for reuse.
    ///
    /// Returns the number of released ids.
    pub fn release_pending(&mut self) -> usize {
        let released = self.pending_free.len();
        // Reverse keeps lowest ids on top of the stack
        self.pending_free.sort_unstable_by(|a, b| b.cmp(a));
        self.free_indices.append(&mut self.pending_free);
        released
    }

    /// Iterates over alive ids in ascending order.
    pub fn iter_alive(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive.iter().map(|slot| EntityId::new(slot as u32))
    }
}
