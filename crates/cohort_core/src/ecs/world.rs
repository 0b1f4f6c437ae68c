//! # ECS World
//!
//! The central container: component store plus subscription manager, with
//! one synchronization point per tick.
//!
//! ```text
//! tick N:   systems mutate components   (changes queue up in the store)
//!           world.step()                (fan-out, cleanup, id release)
//! tick N+1: systems read their views    (lazy sort / compaction on read)
//! ```

use super::component::{Component, ComponentTypeId};
use super::entity::EntityId;
use super::storage::ComponentStore;
use crate::config::SubscriptionConfig;
use crate::error::{WorldError, WorldResult};
use crate::subscription::{
    Aspect, EntityComparator, IterationContainer, StepReport, SubscriptionId,
    SubscriptionManager, ViewId,
};
use std::any::type_name;
use std::sync::Arc;

/// The ECS World - container for all simulation state.
///
/// # Example
///
/// ```rust
/// use cohort_core::{Aspect, Component, SubscriptionConfig, World};
///
/// struct Position(f32);
/// impl Component for Position {}
///
/// let mut world = World::new(SubscriptionConfig::default());
/// let position = world.register_component::<Position>();
/// let movers = world.subscribe(Aspect::from_types(&[position], &[], &[]).unwrap());
///
/// let e = world.spawn();
/// world.insert(e, Position(0.0)).unwrap();
/// world.step();
///
/// assert_eq!(world.matching_ids(movers).unwrap().count(), 1);
/// ```
#[derive(Debug)]
pub struct World {
    store: ComponentStore,
    manager: SubscriptionManager,
}

impl World {
    /// Creates an empty world sized by `config`.
    #[must_use]
    pub fn new(config: SubscriptionConfig) -> Self {
        Self {
            store: ComponentStore::new(config.entity_capacity),
            manager: SubscriptionManager::new(config),
        }
    }

    /// Registers a component type. Idempotent.
    pub fn register_component<C: Component>(&mut self) -> ComponentTypeId {
        self.store.register::<C>()
    }

    /// Type id of `C`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnregisteredComponent`] if `C` was never
    /// registered.
    pub fn type_id<C: Component>(&self) -> WorldResult<ComponentTypeId> {
        self.store
            .type_id::<C>()
            .ok_or(WorldError::UnregisteredComponent(type_name::<C>()))
    }

    /// Returns the number of currently alive entities.
    #[inline]
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.store.entities().alive_count()
    }

    /// Spawns an entity. Subscriptions see it after the next [`World::step`].
    pub fn spawn(&mut self) -> EntityId {
        self.store.spawn()
    }

    /// Despawns an entity, dropping all its components.
    ///
    /// The id is not reused before the end of the next [`World::step`].
    ///
    /// # Returns
    ///
    /// `false` if the entity was not alive.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        self.store.despawn(id)
    }

    /// Checks if an entity is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.store.is_alive(id)
    }

    /// Attaches or replaces a component.
    ///
    /// # Returns
    ///
    /// The replaced value, if any.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DeadEntity`] or
    /// [`WorldError::UnregisteredComponent`].
    pub fn insert<C: Component>(&mut self, id: EntityId, component: C) -> WorldResult<Option<C>> {
        self.check_alive(id)?;
        self.type_id::<C>()?;
        Ok(self.store.insert(id, component))
    }

    /// Detaches a component.
    ///
    /// # Returns
    ///
    /// The detached value, if the entity had one.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DeadEntity`] or
    /// [`WorldError::UnregisteredComponent`].
    pub fn remove<C: Component>(&mut self, id: EntityId) -> WorldResult<Option<C>> {
        self.check_alive(id)?;
        self.type_id::<C>()?;
        Ok(self.store.remove::<C>(id))
    }

    /// Borrows a component.
    #[must_use]
    pub fn get<C: Component>(&self, id: EntityId) -> Option<&C> {
        self.store.get::<C>(id)
    }

    /// Mutably borrows a component. Views ordered by `C` are re-sorted after
    /// the next step.
    pub fn get_mut<C: Component>(&mut self, id: EntityId) -> Option<&mut C> {
        self.store.get_mut::<C>(id)
    }

    /// Returns `true` if the entity holds a `C`.
    #[must_use]
    pub fn has<C: Component>(&self, id: EntityId) -> bool {
        self.store.has::<C>(id)
    }

    /// Forces re-evaluation of `C` on `id` at the next step, e.g. after
    /// interior mutation that a condition watches.
    pub fn touch<C: Component>(&mut self, id: EntityId) -> bool {
        self.store.touch::<C>(id)
    }

    /// Returns the subscription for `aspect`, creating and populating it if
    /// needed. Equal aspects share one subscription.
    pub fn subscribe(&mut self, aspect: Aspect) -> SubscriptionId {
        self.manager.register(aspect, &self.store)
    }

    /// Returns the view of `subscription` under `comparator` (`None` for
    /// insertion order), creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownSubscription`] for a foreign handle.
    pub fn ordered_view(
        &mut self,
        subscription: SubscriptionId,
        comparator: Option<Arc<dyn EntityComparator>>,
    ) -> WorldResult<ViewId> {
        self.manager
            .ordered_view(subscription, comparator, &self.store)
            .ok_or(WorldError::UnknownSubscription(subscription))
    }

    /// Live members of a subscription, in unspecified order.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownSubscription`] for a foreign handle.
    pub fn matching_ids(
        &self,
        subscription: SubscriptionId,
    ) -> WorldResult<impl Iterator<Item = EntityId> + '_> {
        self.manager
            .matching_ids(subscription)
            .ok_or(WorldError::UnknownSubscription(subscription))
    }

    /// Reconciles a view and returns its ids in iteration order.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownView`] for a foreign handle.
    pub fn entities(&mut self, view: ViewId) -> WorldResult<&[EntityId]> {
        let container = self
            .manager
            .view_mut(view)
            .ok_or(WorldError::UnknownView(view))?;
        Ok(container.entities(&self.store))
    }

    /// Walks a view in iteration order with mutable access to the store.
    ///
    /// Mutations made inside `f`, spawns and despawns included, are queued
    /// and take effect at the next [`World::step`]; the sequence being walked
    /// does not change.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownView`] for a foreign handle.
    pub fn for_each<F>(&mut self, view: ViewId, mut f: F) -> WorldResult<()>
    where
        F: FnMut(EntityId, &mut ComponentStore),
    {
        let Self { store, manager } = self;
        let container = manager
            .view_mut(view)
            .ok_or(WorldError::UnknownView(view))?;
        for &id in container.entities(&*store) {
            f(id, store);
        }
        Ok(())
    }

    /// Runs the per-tick synchronization point.
    ///
    /// Forwards queued spawns, despawns and presence changes, invalidates
    /// views ordered by modified types, runs the subscription step, then
    /// makes despawned ids reusable.
    ///
    /// # Panics
    ///
    /// Panics if subscription bookkeeping is found corrupted.
    pub fn step(&mut self) -> StepReport {
        for id in self.store.drain_spawned() {
            self.manager.entity_added(id);
        }
        for id in self.store.drain_despawned() {
            self.manager.entity_removed(id);
        }
        self.manager.record_changes(self.store.drain_changes());
        for type_id in self.store.take_modified() {
            self.manager.mark_order_dirty(type_id);
        }

        let report = self.manager.step(&self.store);
        self.store.release_pending();
        report
    }

    /// The component store.
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &ComponentStore {
        &self.store
    }

    /// Mutable component store. Mutations still queue for the next step.
    #[inline]
    pub fn store_mut(&mut self) -> &mut ComponentStore {
        &mut self.store
    }

    /// The subscription manager.
    #[inline]
    #[must_use]
    pub const fn subscriptions(&self) -> &SubscriptionManager {
        &self.manager
    }

    /// View by handle, without reconciling.
    #[must_use]
    pub fn view(&self, view: ViewId) -> Option<&IterationContainer> {
        self.manager.view(view)
    }

    fn check_alive(&self, id: EntityId) -> WorldResult<()> {
        if self.store.is_alive(id) {
            Ok(())
        } else {
            Err(WorldError::DeadEntity(id))
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(SubscriptionConfig::default())
    }
}
