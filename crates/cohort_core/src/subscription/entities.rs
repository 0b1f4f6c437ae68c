//! # Entity Subscription
//!
//! Live set of ids matching one [`Aspect`], kept incrementally correct.
//!
//! Membership is an id array plus a parallel bitset. Leaving the set only
//! clears the bit; the array slot goes stale until
//! [`EntitySubscription::remove_unused_entities`] compacts once per step.
//! Between the two, the array may hold ids the bitset disowns. Enumeration
//! always filters through the bitset, so stale slots never leak.

use super::aspect::Aspect;
use super::container::{IterationContainer, ViewId};
use super::order::EntityComparator;
use super::source::ComponentSource;
use crate::ecs::{ComponentTypeId, EntityId};
use crate::memory::{BitVector, IdArray};
use std::fmt;
use std::sync::Arc;

/// Handle to a subscription inside a [`SubscriptionManager`](crate::SubscriptionManager).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub(crate) u32);

impl SubscriptionId {
    /// Raw index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscription {}", self.0)
    }
}

/// Cleanup phase of the id array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CleanupState {
    /// Array and bitset agree.
    Clean,
    /// Some array slots are stale.
    Pending,
}

/// Incrementally maintained set of entities matching an aspect.
pub struct EntitySubscription {
    id: SubscriptionId,
    aspect: Aspect,
    relevant_types: BitVector,
    ids: IdArray,
    /// Live members.
    members: BitVector,
    /// Ids whose array slot is stale.
    pending: BitVector,
    pending_count: usize,
    cleanup: CleanupState,
    views: Vec<IterationContainer>,
    entity_capacity: usize,
}

impl EntitySubscription {
    /// Creates an empty subscription for `aspect`.
    ///
    /// # Arguments
    ///
    /// * `id` - Handle assigned by the manager
    /// * `aspect` - Interest predicate
    /// * `entity_capacity` - Pre-size of id-indexed bitsets
    #[must_use]
    pub fn new(id: SubscriptionId, aspect: Aspect, entity_capacity: usize) -> Self {
        let relevant_types = aspect.relevant_types();
        Self {
            id,
            aspect,
            relevant_types,
            ids: IdArray::with_capacity(entity_capacity.min(256)),
            members: BitVector::with_capacity(entity_capacity),
            pending: BitVector::new(),
            pending_count: 0,
            cleanup: CleanupState::Clean,
            views: Vec::new(),
            entity_capacity,
        }
    }

    /// This subscription's handle.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The interest predicate.
    #[inline]
    #[must_use]
    pub const fn aspect(&self) -> &Aspect {
        &self.aspect
    }

    /// Component types whose changes may flip membership.
    #[inline]
    #[must_use]
    pub const fn relevant_types(&self) -> &BitVector {
        &self.relevant_types
    }

    /// Returns `true` if changes of `type_id` concern this subscription.
    #[inline]
    #[must_use]
    pub fn is_interested_in(&self, type_id: ComponentTypeId) -> bool {
        self.relevant_types.contains(type_id.slot())
    }

    /// Number of live members.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len() - self.pending_count
    }

    /// Returns `true` if there are no live members.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `id` is a live member.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(id.slot())
    }

    /// Current cleanup phase.
    #[inline]
    #[must_use]
    pub const fn cleanup_state(&self) -> CleanupState {
        self.cleanup
    }

    /// Evaluates the aspect for `id`. Pure.
    #[inline]
    pub fn matches(&self, id: EntityId, source: &dyn ComponentSource) -> bool {
        self.aspect.matches(id, source)
    }

    /// Live members, in unspecified order.
    pub fn matching_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.ids.iter().filter(|id| self.members.contains(id.slot()))
    }

    /// Re-evaluates `id` and moves it in or out of the set.
    ///
    /// # Returns
    ///
    /// Whether `id` matches after the call.
    pub fn refresh(&mut self, id: EntityId, source: &dyn ComponentSource) -> bool {
        let matched = self.matches(id, source);
        if matched {
            self.add_entity(id, source);
        } else {
            self.set_has_not_entity(id);
        }
        matched
    }

    /// Adds `id` to the set. No-op if already a member.
    ///
    /// A stale slot still holding `id` is revived instead of appending a
    /// second one.
    pub fn add_entity(&mut self, id: EntityId, source: &dyn ComponentSource) {
        let slot = id.slot();
        if !self.members.insert(slot) {
            return;
        }

        if self.pending.remove(slot) {
            self.pending_count -= 1;
            if self.pending_count == 0 {
                self.cleanup = CleanupState::Clean;
            }
        } else {
            self.ids.push(id);
        }

        for view in &mut self.views {
            view.add(id, source);
        }
    }

    /// Drops `id` from the set. No-op if not a member.
    ///
    /// The array slot is reclaimed by the next
    /// [`remove_unused_entities`](Self::remove_unused_entities).
    pub fn set_has_not_entity(&mut self, id: EntityId) {
        let slot = id.slot();
        if !self.members.remove(slot) {
            return;
        }

        self.pending.insert(slot);
        self.pending_count += 1;
        self.cleanup = CleanupState::Pending;

        for view in &mut self.views {
            view.request_remove(id);
        }
    }

    /// Reclaims stale array slots by swapping trailing entries into them.
    ///
    /// O(1) when nothing left the set since the last call.
    ///
    /// # Returns
    ///
    /// Number of slots reclaimed.
    ///
    /// # Panics
    ///
    /// Panics if a slot is neither a member nor pending, or if the number of
    /// reclaimed slots disagrees with the pending count.
    pub fn remove_unused_entities(&mut self) -> usize {
        if self.cleanup == CleanupState::Clean {
            return 0;
        }

        let mut removed = 0;
        let mut index = 0;
        while index < self.ids.len() {
            let id = self.ids.as_slice()[index];
            let slot = id.slot();

            if self.members.contains(slot) {
                index += 1;
            } else if self.pending.remove(slot) {
                self.ids.swap_remove(index);
                removed += 1;
            } else {
                self.corrupted(format_args!("{id} is neither a member nor pending removal"));
            }
        }

        if removed != self.pending_count {
            self.corrupted(format_args!(
                "{removed} slots reclaimed but {} were pending",
                self.pending_count
            ));
        }

        self.pending_count = 0;
        self.cleanup = CleanupState::Clean;
        removed
    }

    /// Returns the view ordered by `comparator`, creating and seeding it with
    /// the current members if none exists yet.
    ///
    /// Views are shared per comparator identity (`None` is the unordered
    /// view).
    pub fn ordered_view(
        &mut self,
        comparator: Option<Arc<dyn EntityComparator>>,
        view_capacity: usize,
        source: &dyn ComponentSource,
    ) -> ViewId {
        let existing = self
            .views
            .iter()
            .find(|view| same_comparator(view.comparator(), comparator.as_ref()));
        if let Some(view) = existing {
            return view.id();
        }

        let view_id = ViewId {
            subscription: self.id.0,
            slot: self.views.len() as u32,
        };
        let mut view = IterationContainer::new(
            view_id,
            comparator,
            view_capacity.max(self.len()),
            self.entity_capacity,
        );
        for id in self.matching_ids() {
            view.add(id, source);
        }

        tracing::debug!(
            "Created {} (ordered: {}, seeded with {} entities)",
            view_id,
            view.is_ordered(),
            view.len()
        );
        self.views.push(view);
        view_id
    }

    /// Number of views fed by this subscription.
    #[inline]
    #[must_use]
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// View at `slot`.
    #[must_use]
    pub fn view(&self, slot: u32) -> Option<&IterationContainer> {
        self.views.get(slot as usize)
    }

    /// Mutable view at `slot`.
    pub fn view_mut(&mut self, slot: u32) -> Option<&mut IterationContainer> {
        self.views.get_mut(slot as usize)
    }

    /// Marks views whose comparator depends on `type_id` as needing a sort.
    pub fn mark_order_dirty(&mut self, type_id: ComponentTypeId) {
        for view in &mut self.views {
            if view.comparator().is_some_and(|c| c.depends_on(type_id)) {
                view.mark_order_dirty();
            }
        }
    }

    #[cold]
    #[inline(never)]
    fn corrupted(&self, detail: fmt::Arguments<'_>) -> ! {
        tracing::error!("{} corrupted ({:?}): {}", self.id, self.aspect, detail);
        panic!("{} corrupted: {detail}", self.id);
    }
}

impl fmt::Debug for EntitySubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySubscription")
            .field("id", &self.id)
            .field("aspect", &self.aspect)
            .field("len", &self.len())
            .field("cleanup", &self.cleanup)
            .field("views", &self.views.len())
            .finish()
    }
}

/// Comparator identity: same allocation, or both absent.
fn same_comparator(
    a: Option<&Arc<dyn EntityComparator>>,
    b: Option<&Arc<dyn EntityComparator>>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>(),
        _ => false,
    }
}
