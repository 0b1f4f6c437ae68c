//! # Subscription Manager
//!
//! Owns every subscription, interns them by aspect, and fans queued
//! mutations out once per step.
//!
//! ## Step Order
//!
//! ```text
//! 1. bulk entity-added     -> every subscription evaluates each id
//! 2. presence changes FIFO -> only subscriptions indexed under the type
//! 3. bulk entity-removed   -> every subscription drops each id
//! 4. order invalidation    -> views sorted on a changed type go dirty
//! 5. cleanup               -> remove_unused_entities on every subscription
//! ```
//!
//! Evaluation reads the source at drain time, so an entity that gains and
//! loses a component inside one step is classified by its final state.

use super::aspect::Aspect;
use super::container::{IterationContainer, ViewId};
use super::entities::{EntitySubscription, SubscriptionId};
use super::order::EntityComparator;
use super::source::{ComponentSource, PresenceChange};
use crate::config::SubscriptionConfig;
use crate::ecs::{ComponentTypeId, EntityId};
use crate::memory::BitVector;
use std::collections::HashMap;
use std::sync::Arc;

/// Cumulative fan-out counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FanOutStats {
    /// Aspect evaluations performed.
    pub evaluations: u64,
    /// Presence-change records drained.
    pub changes_drained: u64,
    /// Steps run.
    pub steps: u64,
}

/// What one [`SubscriptionManager::step`] processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Ids from the bulk entity-added list.
    pub entities_added: usize,
    /// Presence-change records drained.
    pub changes_drained: usize,
    /// Ids from the bulk entity-removed list.
    pub entities_removed: usize,
    /// Aspect evaluations performed this step.
    pub evaluations: u64,
    /// Stale subscription slots reclaimed.
    pub slots_reclaimed: usize,
}

/// Registry and change fan-out for entity subscriptions.
#[derive(Debug)]
pub struct SubscriptionManager {
    config: SubscriptionConfig,
    subscriptions: Vec<EntitySubscription>,
    interned: HashMap<Aspect, SubscriptionId>,
    /// Component type slot -> subscriptions whose aspect involves it.
    by_type: Vec<Vec<SubscriptionId>>,
    changes: Vec<PresenceChange>,
    added: Vec<EntityId>,
    removed: Vec<EntityId>,
    /// Types with presence changes this step, for order invalidation.
    changed_types: BitVector,
    stats: FanOutStats,
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new(SubscriptionConfig::default())
    }
}

impl SubscriptionManager {
    /// Creates an empty manager sized by `config`.
    #[must_use]
    pub fn new(config: SubscriptionConfig) -> Self {
        Self {
            changes: Vec::with_capacity(config.change_queue_capacity),
            config,
            subscriptions: Vec::new(),
            interned: HashMap::new(),
            by_type: Vec::new(),
            added: Vec::new(),
            removed: Vec::new(),
            changed_types: BitVector::new(),
            stats: FanOutStats::default(),
        }
    }

    /// Sizing in effect.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &SubscriptionConfig {
        &self.config
    }

    /// Returns the subscription for `aspect`, creating it if needed.
    ///
    /// Structurally equal aspects share one subscription. A new
    /// subscription is populated from the source's live entities (a simple
    /// aspect gets the sentinel instead).
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX` subscriptions are registered.
    pub fn register(&mut self, aspect: Aspect, source: &dyn ComponentSource) -> SubscriptionId {
        if let Some(&id) = self.interned.get(&aspect) {
            return id;
        }

        let id = SubscriptionId(
            u32::try_from(self.subscriptions.len()).expect("subscription count exceeds u32::MAX"),
        );
        let mut subscription =
            EntitySubscription::new(id, aspect.clone(), self.config.entity_capacity);

        for slot in subscription.relevant_types().iter() {
            if self.by_type.len() <= slot {
                self.by_type.resize_with(slot + 1, Vec::new);
            }
            self.by_type[slot].push(id);
        }

        if aspect.is_simple() {
            subscription.add_entity(EntityId::SENTINEL, source);
        } else {
            let mut evaluated = 0u64;
            source.for_each_entity(&mut |entity| {
                subscription.refresh(entity, source);
                evaluated += 1;
            });
            self.stats.evaluations += evaluated;
        }

        tracing::debug!(
            "Registered {} with {} initial members: {:?}",
            id,
            subscription.len(),
            aspect
        );
        self.subscriptions.push(subscription);
        self.interned.insert(aspect, id);
        id
    }

    /// Returns the view of `subscription` ordered by `comparator`, creating
    /// it if needed. `None` requests the unordered view.
    ///
    /// Views are shared per comparator identity (same `Arc`).
    ///
    /// # Returns
    ///
    /// `None` if `subscription` is unknown.
    pub fn ordered_view(
        &mut self,
        subscription: SubscriptionId,
        comparator: Option<Arc<dyn EntityComparator>>,
        source: &dyn ComponentSource,
    ) -> Option<ViewId> {
        let capacity = self.config.view_capacity;
        let subscription = self.subscriptions.get_mut(subscription.0 as usize)?;
        Some(subscription.ordered_view(comparator, capacity, source))
    }

    /// Queues one presence change.
    #[inline]
    pub fn record_change(&mut self, change: PresenceChange) {
        self.changes.push(change);
    }

    /// Queues presence changes, preserving their order.
    pub fn record_changes<I>(&mut self, changes: I)
    where
        I: IntoIterator<Item = PresenceChange>,
    {
        self.changes.extend(changes);
    }

    /// Queues a newly created entity.
    #[inline]
    pub fn entity_added(&mut self, id: EntityId) {
        self.added.push(id);
    }

    /// Queues a deleted entity.
    #[inline]
    pub fn entity_removed(&mut self, id: EntityId) {
        self.removed.push(id);
    }

    /// Number of queued presence changes.
    #[inline]
    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.changes.len()
    }

    /// Flags views ordered by a comparator depending on `type_id` for a sort
    /// at their next read.
    pub fn mark_order_dirty(&mut self, type_id: ComponentTypeId) {
        for subscription in &mut self.subscriptions {
            subscription.mark_order_dirty(type_id);
        }
    }

    /// Applies everything queued since the last step.
    ///
    /// Call exactly once per tick, after all mutation-producing code ran.
    ///
    /// # Panics
    ///
    /// Panics if a subscription's bookkeeping is found corrupted.
    pub fn step(&mut self, source: &dyn ComponentSource) -> StepReport {
        let before = self.stats.evaluations;
        let mut report = StepReport {
            entities_added: self.added.len(),
            changes_drained: self.changes.len(),
            entities_removed: self.removed.len(),
            ..StepReport::default()
        };

        for &entity in &self.added {
            for subscription in &mut self.subscriptions {
                subscription.refresh(entity, source);
                self.stats.evaluations += 1;
            }
        }

        for &change in &self.changes {
            let type_id = change.component_type();
            self.changed_types.insert(type_id.slot());

            let Some(interested) = self.by_type.get(type_id.slot()) else {
                continue;
            };
            for id in interested {
                self.subscriptions[id.0 as usize].refresh(change.entity(), source);
                self.stats.evaluations += 1;
            }
        }

        for &entity in &self.removed {
            for subscription in &mut self.subscriptions {
                subscription.set_has_not_entity(entity);
            }
        }

        for slot in self.changed_types.iter() {
            let type_id = ComponentTypeId::new(slot as u32);
            for subscription in &mut self.subscriptions {
                subscription.mark_order_dirty(type_id);
            }
        }

        for subscription in &mut self.subscriptions {
            report.slots_reclaimed += subscription.remove_unused_entities();
        }

        self.added.clear();
        self.changes.clear();
        self.removed.clear();
        self.changed_types.clear();

        report.evaluations = self.stats.evaluations - before;
        self.stats.changes_drained += report.changes_drained as u64;
        self.stats.steps += 1;

        tracing::trace!("Subscription step {}: {:?}", self.stats.steps, report);
        report
    }

    /// Cumulative fan-out counters.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> FanOutStats {
        self.stats
    }

    /// Zeroes the fan-out counters.
    pub fn reset_stats(&mut self) {
        self.stats = FanOutStats::default();
    }

    /// Number of registered subscriptions.
    #[inline]
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Subscription by handle.
    #[must_use]
    pub fn subscription(&self, id: SubscriptionId) -> Option<&EntitySubscription> {
        self.subscriptions.get(id.0 as usize)
    }

    /// Live members of a subscription, in unspecified order.
    pub fn matching_ids(
        &self,
        id: SubscriptionId,
    ) -> Option<impl Iterator<Item = EntityId> + '_> {
        self.subscription(id).map(|subscription| subscription.matching_ids())
    }

    /// View by handle.
    #[must_use]
    pub fn view(&self, id: ViewId) -> Option<&IterationContainer> {
        self.subscriptions
            .get(id.subscription as usize)?
            .view(id.slot)
    }

    /// Mutable view by handle, for reading via
    /// [`IterationContainer::entities`].
    pub fn view_mut(&mut self, id: ViewId) -> Option<&mut IterationContainer> {
        self.subscriptions
            .get_mut(id.subscription as usize)?
            .view_mut(id.slot)
    }

    /// Iterates all subscriptions in registration order.
    pub fn subscriptions(&self) -> impl Iterator<Item = &EntitySubscription> {
        self.subscriptions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::aspect::{AspectElement, Predicate};
    use crate::subscription::order::ComponentOrder;
    use std::any::Any;
    use std::collections::{BTreeMap, BTreeSet};

    const C1: ComponentTypeId = ComponentTypeId::new(0);
    const C2: ComponentTypeId = ComponentTypeId::new(1);
    const C3: ComponentTypeId = ComponentTypeId::new(2);
    const C4: ComponentTypeId = ComponentTypeId::new(3);

    /// Minimal store that queues its own changes.
    #[derive(Default)]
    struct Store {
        rows: BTreeMap<EntityId, BTreeMap<ComponentTypeId, i32>>,
        outbox: Vec<PresenceChange>,
    }

    impl Store {
        fn spawn(&mut self, raw: u32) -> EntityId {
            let id = EntityId::new(raw);
            self.rows.insert(id, BTreeMap::new());
            id
        }

        fn set(&mut self, id: EntityId, type_id: ComponentTypeId, value: i32) {
            if let Some(row) = self.rows.get_mut(&id) {
                row.insert(type_id, value);
                self.outbox.push(PresenceChange::added(id, type_id));
            }
        }

        fn unset(&mut self, id: EntityId, type_id: ComponentTypeId) {
            if let Some(row) = self.rows.get_mut(&id) {
                if row.remove(&type_id).is_some() {
                    self.outbox.push(PresenceChange::removed(id, type_id));
                }
            }
        }

        fn flush(&mut self, manager: &mut SubscriptionManager) -> StepReport {
            manager.record_changes(self.outbox.drain(..));
            manager.step(&*self)
        }
    }

    impl ComponentSource for Store {
        fn has_component(&self, entity: EntityId, type_id: ComponentTypeId) -> bool {
            self.rows.get(&entity).is_some_and(|row| row.contains_key(&type_id))
        }

        fn component(&self, entity: EntityId, type_id: ComponentTypeId) -> Option<&dyn Any> {
            self.rows.get(&entity)?.get(&type_id).map(|v| v as &dyn Any)
        }

        fn type_count(&self) -> usize {
            4
        }

        fn for_each_entity(&self, f: &mut dyn FnMut(EntityId)) {
            self.rows.keys().copied().for_each(f);
        }
    }

    fn members(manager: &SubscriptionManager, id: SubscriptionId) -> BTreeSet<u32> {
        manager
            .matching_ids(id)
            .unwrap()
            .map(EntityId::index)
            .collect()
    }

    #[test]
    fn test_equal_aspects_share_subscription() {
        let store = Store::default();
        let mut manager = SubscriptionManager::default();

        let a = manager.register(Aspect::from_types(&[C1, C2], &[], &[C3]).unwrap(), &store);
        let b = manager.register(Aspect::from_types(&[C2, C1], &[], &[C3]).unwrap(), &store);
        let c = manager.register(Aspect::from_types(&[C1], &[], &[]).unwrap(), &store);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(manager.subscription_count(), 2);
    }

    #[test]
    fn test_register_populates_from_live_entities() {
        let mut store = Store::default();
        let e1 = store.spawn(1);
        let e2 = store.spawn(2);
        store.set(e1, C1, 0);
        store.set(e2, C2, 0);
        store.outbox.clear();

        let mut manager = SubscriptionManager::default();
        let id = manager.register(Aspect::from_types(&[C1], &[], &[]).unwrap(), &store);
        assert_eq!(members(&manager, id), BTreeSet::from([1]));
    }

    #[test]
    fn test_simple_aspect_holds_sentinel() {
        let mut store = Store::default();
        let e1 = store.spawn(1);
        let mut manager = SubscriptionManager::default();
        let id = manager.register(Aspect::simple(), &store);
        assert_eq!(members(&manager, id), BTreeSet::from([0]));

        manager.entity_added(e1);
        store.set(e1, C1, 0);
        store.flush(&mut manager);
        assert_eq!(members(&manager, id), BTreeSet::from([0]));
    }

    #[test]
    fn test_exclude_scenario_across_steps() {
        let mut store = Store::default();
        let mut manager = SubscriptionManager::default();
        let id = manager.register(Aspect::from_types(&[C1, C2], &[], &[C3]).unwrap(), &store);

        let e = store.spawn(1);
        manager.entity_added(e);
        store.set(e, C1, 0);
        store.set(e, C2, 0);
        store.flush(&mut manager);
        assert!(manager.subscription(id).unwrap().contains(e));

        store.set(e, C3, 0);
        store.flush(&mut manager);
        assert!(!manager.subscription(id).unwrap().contains(e));

        store.unset(e, C3);
        store.flush(&mut manager);
        assert!(manager.subscription(id).unwrap().contains(e));
    }

    #[test]
    fn test_gain_and_lose_within_one_step() {
        let mut store = Store::default();
        let mut manager = SubscriptionManager::default();
        let id = manager.register(Aspect::from_types(&[C1], &[], &[]).unwrap(), &store);

        let e = store.spawn(1);
        manager.entity_added(e);
        store.set(e, C1, 0);
        store.unset(e, C1);
        store.flush(&mut manager);

        assert!(members(&manager, id).is_empty());
        assert!(manager.subscription(id).unwrap().is_empty());
    }

    #[test]
    fn test_fan_out_precision() {
        let mut store = Store::default();
        let e = store.spawn(1);
        let mut manager = SubscriptionManager::default();

        // 2 subscriptions care about C4, 3 do not
        manager.register(Aspect::from_types(&[C4], &[], &[]).unwrap(), &store);
        manager.register(Aspect::from_types(&[C1], &[], &[C4]).unwrap(), &store);
        manager.register(Aspect::from_types(&[C1], &[], &[]).unwrap(), &store);
        manager.register(Aspect::from_types(&[C2], &[], &[]).unwrap(), &store);
        manager.register(Aspect::from_types(&[], &[C2, C3], &[]).unwrap(), &store);
        manager.reset_stats();

        store.set(e, C4, 0);
        let report = store.flush(&mut manager);

        assert_eq!(report.changes_drained, 1);
        assert_eq!(report.evaluations, 2);
        assert_eq!(manager.stats().evaluations, 2);
        assert_eq!(manager.stats().steps, 1);
    }

    #[test]
    fn test_condition_watches_types() {
        let mut store = Store::default();
        let e = store.spawn(1);
        store.set(e, C1, 5);
        store.outbox.clear();

        let deep = Predicate::new("deep", &[C1], |entity, source: &dyn ComponentSource| {
            source.get::<i32>(entity, C1).is_some_and(|depth| *depth > 10)
        });
        let aspect = Aspect::new(vec![AspectElement::condition(deep)], vec![], vec![]).unwrap();

        let mut manager = SubscriptionManager::default();
        let id = manager.register(aspect, &store);
        assert!(members(&manager, id).is_empty());

        store.set(e, C1, 20);
        store.flush(&mut manager);
        assert_eq!(members(&manager, id), BTreeSet::from([1]));
    }

    #[test]
    fn test_removed_entity_leaves_every_subscription() {
        let mut store = Store::default();
        let e = store.spawn(1);
        store.set(e, C1, 0);
        store.set(e, C2, 0);
        store.outbox.clear();

        let mut manager = SubscriptionManager::default();
        let a = manager.register(Aspect::from_types(&[C1], &[], &[]).unwrap(), &store);
        let b = manager.register(Aspect::from_types(&[C2], &[], &[]).unwrap(), &store);

        store.rows.remove(&e);
        manager.entity_removed(e);
        let report = store.flush(&mut manager);

        assert_eq!(report.slots_reclaimed, 2);
        assert!(members(&manager, a).is_empty());
        assert!(members(&manager, b).is_empty());
    }

    #[test]
    fn test_presence_change_dirties_dependent_views() {
        let mut store = Store::default();
        let e1 = store.spawn(1);
        let e2 = store.spawn(2);
        for (e, v) in [(e1, 1), (e2, 2)] {
            store.set(e, C1, 0);
            store.set(e, C2, v);
        }
        store.outbox.clear();

        let mut manager = SubscriptionManager::default();
        let id = manager.register(Aspect::from_types(&[C1], &[], &[]).unwrap(), &store);
        let order: Arc<dyn EntityComparator> = Arc::new(ComponentOrder::<i32>::new(C2));
        let view = manager.ordered_view(id, Some(order), &store).unwrap();

        // Membership unchanged, sort key changed
        store.set(e1, C2, 9);
        store.flush(&mut manager);

        let ids: Vec<u32> = manager
            .view_mut(view)
            .unwrap()
            .entities(&store)
            .iter()
            .map(|id| id.index())
            .collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_unknown_handles() {
        let store = Store::default();
        let mut manager = SubscriptionManager::default();
        assert!(manager.ordered_view(SubscriptionId(3), None, &store).is_none());
        assert!(manager.matching_ids(SubscriptionId(3)).is_none());
    }
}
