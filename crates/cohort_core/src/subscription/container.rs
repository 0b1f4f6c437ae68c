//! # Ordered Iteration Container
//!
//! The id sequence a processing unit actually walks, once per step.
//!
//! Two independent state machines, both reconciled lazily on read:
//!
//! ```text
//! Order:    Clean --(out-of-order append / external signal)--> Dirty
//!           Dirty --(read: sort)--> Clean
//!
//! Removal:  None --(request_remove)--> Pending
//!           Pending --(read: stable compaction)--> None
//! ```
//!
//! ## Performance
//!
//! - `add`: amortized O(1), one comparison when ordered
//! - `request_remove`: O(1), the array is not touched
//! - Read with nothing owed: direct slice, zero overhead
//! - Read with work owed: one combined compaction + prefix scan, then an
//!   adaptive sort that only pays for the perturbed region
//!
//! Compaction of an ordered container always re-checks neighbor order. An id
//! appended next to a member that already lost its sort key (despawned, not
//! yet removed) may look in order at `add` time and only show up as a
//! violation once that member is gone.

use super::order::EntityComparator;
use super::sort;
use super::source::ComponentSource;
use crate::ecs::EntityId;
use crate::memory::{BitVector, IdArray};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Identifies one container inside a [`SubscriptionManager`](crate::SubscriptionManager).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ViewId {
    /// Owning subscription index.
    pub(crate) subscription: u32,
    /// Container index within the subscription.
    pub(crate) slot: u32,
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscription {} view {}", self.subscription, self.slot)
    }
}

/// Order reconciliation phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderState {
    /// Array is in comparator order (or the container is unordered).
    Clean,
    /// A sort is owed before the next read.
    Dirty,
}

/// Removal reconciliation phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemovalState {
    /// Every array slot is live.
    None,
    /// Some slots are flagged for removal; compaction is owed.
    Pending,
}

/// Lazily compacted, lazily sorted id sequence.
pub struct IterationContainer {
    id: ViewId,
    ids: IdArray,
    /// Ids physically in `ids` (live or pending removal).
    present: BitVector,
    /// Ids in `ids` flagged for removal.
    pending: BitVector,
    pending_count: usize,
    order: OrderState,
    removal: RemovalState,
    comparator: Option<Arc<dyn EntityComparator>>,
    /// Merge buffer, reused across sorts.
    scratch: Vec<EntityId>,
}

impl IterationContainer {
    /// Creates an empty container.
    ///
    /// Without a comparator, insertion order is iteration order.
    #[must_use]
    pub fn new(
        id: ViewId,
        comparator: Option<Arc<dyn EntityComparator>>,
        capacity: usize,
        entity_capacity: usize,
    ) -> Self {
        Self {
            id,
            ids: IdArray::with_capacity(capacity),
            present: BitVector::with_capacity(entity_capacity),
            pending: BitVector::with_capacity(entity_capacity),
            pending_count: 0,
            order: OrderState::Clean,
            removal: RemovalState::None,
            comparator,
            scratch: Vec::new(),
        }
    }

    /// This container's id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ViewId {
        self.id
    }

    /// Number of live ids (excludes ids pending removal).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len() - self.pending_count
    }

    /// Returns `true` if no id is live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if a comparator is attached.
    #[inline]
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.comparator.is_some()
    }

    /// The attached comparator, if any.
    #[must_use]
    pub fn comparator(&self) -> Option<&Arc<dyn EntityComparator>> {
        self.comparator.as_ref()
    }

    /// Current order phase.
    #[inline]
    #[must_use]
    pub const fn order_state(&self) -> OrderState {
        self.order
    }

    /// Current removal phase.
    #[inline]
    #[must_use]
    pub const fn removal_state(&self) -> RemovalState {
        self.removal
    }

    /// Returns `true` if `id` is live (present and not pending removal).
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.present.contains(id.slot()) && !self.pending.contains(id.slot())
    }

    /// Adds an id.
    ///
    /// An id pending removal is revived in place instead of appended twice.
    /// An already live id is ignored.
    pub fn add(&mut self, id: EntityId, source: &dyn ComponentSource) {
        let slot = id.slot();

        if self.pending.remove(slot) {
            self.pending_count -= 1;
            if self.pending_count == 0 {
                self.removal = RemovalState::None;
            }
            // Its sort key may have changed while it was out
            if self.comparator.is_some() {
                self.order = OrderState::Dirty;
            }
            return;
        }

        if !self.present.insert(slot) {
            return;
        }

        if self.order == OrderState::Clean {
            if let (Some(comparator), Some(previous)) = (&self.comparator, self.ids.last()) {
                // A pending neighbor may have lost its sort key already
                let out_of_order = self.pending.contains(previous.slot())
                    || comparator.compare(previous, id, source) == Ordering::Greater;
                if out_of_order {
                    self.order = OrderState::Dirty;
                }
            }
        }
        self.ids.push(id);
    }

    /// Flags an id for removal at the next read. Idempotent; ids not present
    /// are ignored.
    #[inline]
    pub fn request_remove(&mut self, id: EntityId) {
        let slot = id.slot();
        if self.present.contains(slot) && self.pending.insert(slot) {
            self.pending_count += 1;
            self.removal = RemovalState::Pending;
        }
    }

    /// Forces a sort at the next read, e.g. after sort keys changed.
    #[inline]
    pub fn mark_order_dirty(&mut self) {
        if self.comparator.is_some() {
            self.order = OrderState::Dirty;
        }
    }

    /// Reconciles owed work and returns the live ids in iteration order.
    ///
    /// # Panics
    ///
    /// Panics if the container's bookkeeping is corrupted.
    pub fn entities(&mut self, source: &dyn ComponentSource) -> &[EntityId] {
        self.reconcile(source);
        self.ids.as_slice()
    }

    /// Reconciles owed work, then calls `f` for every live id in order.
    ///
    /// # Panics
    ///
    /// Panics if the container's bookkeeping is corrupted.
    pub fn for_each<F>(&mut self, source: &dyn ComponentSource, mut f: F)
    where
        F: FnMut(EntityId),
    {
        for &id in self.entities(source) {
            f(id);
        }
    }

    /// Performs any deferred compaction and sort.
    ///
    /// # Panics
    ///
    /// Panics if the container's bookkeeping is corrupted.
    pub fn reconcile(&mut self, source: &dyn ComponentSource) {
        if self.removal == RemovalState::Pending && self.pending_count == self.ids.len() {
            self.clear();
            return;
        }

        let Some(comparator) = self.comparator.clone() else {
            if self.removal == RemovalState::Pending {
                self.compact(None);
            }
            return;
        };

        let mut compare = |a: EntityId, b: EntityId| comparator.compare(a, b, source);
        let prefix = match (self.order, self.removal) {
            (OrderState::Clean, RemovalState::None) => return,
            (OrderState::Dirty, RemovalState::None) => {
                sort::sort_ids(self.ids.as_mut_slice(), &mut self.scratch, &mut compare);
                self.order = OrderState::Clean;
                return;
            }
            (_, RemovalState::Pending) => self.compact(Some(
                &mut compare as &mut dyn FnMut(EntityId, EntityId) -> Ordering,
            )),
        };

        if prefix < self.ids.len() {
            sort::sort_with_prefix(
                self.ids.as_mut_slice(),
                prefix,
                &mut self.scratch,
                &mut compare,
            );
        }
        self.order = OrderState::Clean;
    }

    /// Empties the container, keeping its allocations.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.present.clear();
        self.pending.clear();
        self.pending_count = 0;
        self.removal = RemovalState::None;
        self.order = OrderState::Clean;
    }

    /// Stable compaction in a single pass.
    ///
    /// With a comparator, also measures the sorted prefix of the survivors so
    /// the following sort can skip its own scan. Returns that prefix length
    /// (the survivor count when no comparator is given).
    fn compact(
        &mut self,
        mut compare: Option<&mut dyn FnMut(EntityId, EntityId) -> Ordering>,
    ) -> usize {
        let Self {
            id: view,
            ids,
            present,
            pending,
            pending_count,
            removal,
            ..
        } = self;
        let view = *view;

        let mut kept = 0;
        let mut previous: Option<EntityId> = None;
        let mut prefix: Option<usize> = None;

        let removed = ids.retain_stable(|id| {
            let slot = id.slot();
            if !present.contains(slot) {
                corrupted(view, format_args!("{id} is in the array but not marked present"));
            }

            if pending.remove(slot) {
                present.remove(slot);
                return false;
            }

            if let (None, Some(prev), Some(compare)) = (prefix, previous, compare.as_mut()) {
                if compare(prev, id) == Ordering::Greater {
                    prefix = Some(kept);
                }
            }
            previous = Some(id);
            kept += 1;
            true
        });

        if removed != *pending_count {
            corrupted(
                view,
                format_args!("{removed} ids compacted but {pending_count} were pending"),
            );
        }

        *pending_count = 0;
        *removal = RemovalState::None;
        prefix.unwrap_or(kept)
    }
}

impl fmt::Debug for IterationContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterationContainer")
            .field("id", &self.id)
            .field("len", &self.len())
            .field("pending", &self.pending_count)
            .field("order", &self.order)
            .field("removal", &self.removal)
            .field("comparator", &self.comparator)
            .finish()
    }
}

/// Aborts on impossible reconciliation state.
#[cold]
#[inline(never)]
fn corrupted(view: ViewId, detail: fmt::Arguments<'_>) -> ! {
    tracing::error!("iteration container corrupted ({}): {}", view, detail);
    panic!("iteration container corrupted ({view}): {detail}");
}
