//! # Component Storage
//!
//! Dense, id-indexed component columns plus the store that ties them to an
//! entity allocator and a type registry.
//!
//! The storage uses a dense array strategy:
//! - Every column is pre-sized to the configured entity capacity
//! - Access is O(1) via entity index
//! - Columns grow on demand when ids outrun the pre-size
//!
//! Every attach, detach and replace is recorded as a [`PresenceChange`] in
//! the store's outbox, and every spawn and despawn in its lifecycle queues;
//! [`World::step`](crate::World::step) forwards all of them to the
//! subscription manager.

use super::component::{Component, ComponentRegistry, ComponentTypeId};
use super::entity::{EntityAllocator, EntityId};
use crate::memory::BitVector;
use crate::subscription::{ComponentSource, PresenceChange};
use std::any::Any;

/// Dense column for a single component type.
///
/// # Type Parameters
///
/// * `C` - The component type to store
///
/// # Example
///
/// ```rust,ignore
/// let mut storage: ComponentStorage<Depth> = ComponentStorage::new(1024);
/// storage.insert(EntityId::new(3), Depth(7));
/// ```
#[derive(Debug)]
pub struct ComponentStorage<C: Component> {
    /// One slot per entity index.
    data: Vec<Option<C>>,
    /// Occupied slots.
    len: usize,
}

impl<C: Component> ComponentStorage<C> {
    /// Creates an empty column pre-sized for `capacity` entities.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut data = Vec::with_capacity(capacity);
        data.resize_with(capacity, || None);
        Self { data, len: 0 }
    }

    /// Number of pre-sized (or grown) slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of entities holding a value.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no entity holds a value.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gets a component by entity.
    #[inline]
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&C> {
        self.data.get(id.slot())?.as_ref()
    }

    /// Gets a mutable component by entity.
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut C> {
        self.data.get_mut(id.slot())?.as_mut()
    }

    /// Returns `true` if `id` holds a value.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Stores a value, growing the column if needed.
    ///
    /// # Returns
    ///
    /// The replaced value, if any.
    pub fn insert(&mut self, id: EntityId, component: C) -> Option<C> {
        let slot = id.slot();
        if slot >= self.data.len() {
            let grown = (slot + 1).max(self.data.len() * 2);
            self.data.resize_with(grown, || None);
        }

        let previous = self.data[slot].replace(component);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Takes the value out of a slot.
    pub fn remove(&mut self, id: EntityId) -> Option<C> {
        let previous = self.data.get_mut(id.slot())?.take();
        if previous.is_some() {
            self.len -= 1;
        }
        previous
    }

    /// Iterates over occupied slots with their entity ids.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &C)> {
        self.data
            .iter()
            .enumerate()
            .filter_map(|(slot, value)| Some((EntityId::new(slot as u32), value.as_ref()?)))
    }
}

/// Object-safe view of a column, so the store can hold columns of mixed
/// types.
trait ErasedColumn: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn contains(&self, id: EntityId) -> bool;
    fn value(&self, id: EntityId) -> Option<&dyn Any>;
    fn clear_slot(&mut self, id: EntityId) -> bool;
}

impl<C: Component> ErasedColumn for ComponentStorage<C> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn contains(&self, id: EntityId) -> bool {
        ComponentStorage::contains(self, id)
    }

    fn value(&self, id: EntityId) -> Option<&dyn Any> {
        self.get(id).map(|value| value as &dyn Any)
    }

    fn clear_slot(&mut self, id: EntityId) -> bool {
        self.remove(id).is_some()
    }
}

/// Entity allocator, type registry and component columns.
///
/// The reference [`ComponentSource`]: plain `Option<C>` columns, no
/// archetypes. Mutations queue [`PresenceChange`] records in an outbox, and
/// spawns and despawns queue their ids, instead of notifying anyone directly.
pub struct ComponentStore {
    entities: EntityAllocator,
    registry: ComponentRegistry,
    /// Indexed by component type slot.
    columns: Vec<Box<dyn ErasedColumn>>,
    outbox: Vec<PresenceChange>,
    /// Ids spawned since the last drain.
    spawned: Vec<EntityId>,
    /// Ids despawned since the last drain.
    despawned: Vec<EntityId>,
    /// Types whose values were replaced or borrowed mutably since the last
    /// drain.
    modified: BitVector,
    entity_capacity: usize,
}

impl ComponentStore {
    /// Creates an empty store pre-sized for `entity_capacity` ids.
    #[must_use]
    pub fn new(entity_capacity: usize) -> Self {
        Self {
            entities: EntityAllocator::new(entity_capacity),
            registry: ComponentRegistry::new(),
            columns: Vec::new(),
            outbox: Vec::new(),
            spawned: Vec::new(),
            despawned: Vec::new(),
            modified: BitVector::new(),
            entity_capacity,
        }
    }

    /// Registers `C`, allocating its column. Idempotent.
    pub fn register<C: Component>(&mut self) -> ComponentTypeId {
        let type_id = self.registry.register::<C>();
        if type_id.slot() == self.columns.len() {
            self.columns
                .push(Box::new(ComponentStorage::<C>::new(self.entity_capacity)));
        }
        type_id
    }

    /// The type registry.
    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// The entity allocator.
    #[inline]
    #[must_use]
    pub const fn entities(&self) -> &EntityAllocator {
        &self.entities
    }

    /// Type id of `C`, if registered.
    #[inline]
    #[must_use]
    pub fn type_id<C: Component>(&self) -> Option<ComponentTypeId> {
        self.registry.id_of::<C>()
    }

    /// Allocates a fresh entity with no components and queues it as added.
    pub fn spawn(&mut self) -> EntityId {
        let id = self.entities.spawn();
        self.spawned.push(id);
        id
    }

    /// Detaches every component, frees the id and queues it as removed.
    ///
    /// Per-component detaches are not queued: the bulk removal covers them.
    ///
    /// # Returns
    ///
    /// `false` if the entity was not alive.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if !self.entities.despawn(id) {
            return false;
        }
        for column in &mut self.columns {
            column.clear_slot(id);
        }
        self.despawned.push(id);
        true
    }

    /// Returns `true` if `id` is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.is_alive(id)
    }

    /// Attaches or replaces `C` on `id` and queues the change.
    ///
    /// # Returns
    ///
    /// The replaced value, or `None` if `C` is unregistered, `id` is dead,
    /// or nothing was replaced. Use [`ComponentStore::has`] and
    /// [`ComponentStore::type_id`] to tell those apart.
    pub fn insert<C: Component>(&mut self, id: EntityId, component: C) -> Option<C> {
        if !self.entities.is_alive(id) {
            return None;
        }
        let type_id = self.registry.id_of::<C>()?;
        let previous = self.column_mut::<C>(type_id)?.insert(id, component);
        if previous.is_some() {
            self.modified.insert(type_id.slot());
        }
        self.outbox.push(PresenceChange::added(id, type_id));
        previous
    }

    /// Detaches `C` from `id`, queuing the change if there was one.
    pub fn remove<C: Component>(&mut self, id: EntityId) -> Option<C> {
        let type_id = self.registry.id_of::<C>()?;
        let previous = self.column_mut::<C>(type_id)?.remove(id);
        if previous.is_some() {
            self.outbox.push(PresenceChange::removed(id, type_id));
        }
        previous
    }

    /// Borrows `C` on `id`.
    #[must_use]
    pub fn get<C: Component>(&self, id: EntityId) -> Option<&C> {
        let type_id = self.registry.id_of::<C>()?;
        self.column::<C>(type_id)?.get(id)
    }

    /// Mutably borrows `C` on `id` and marks `C`'s values modified, so views
    /// ordered by it are re-sorted after the next step.
    pub fn get_mut<C: Component>(&mut self, id: EntityId) -> Option<&mut C> {
        let type_id = self.registry.id_of::<C>()?;
        self.modified.insert(type_id.slot());
        self.column_mut::<C>(type_id)?.get_mut(id)
    }

    /// Returns `true` if `id` holds a `C`.
    #[must_use]
    pub fn has<C: Component>(&self, id: EntityId) -> bool {
        self.get::<C>(id).is_some()
    }

    /// Queues an "added" change for `C` on `id` without touching the value,
    /// forcing instance and condition elements to re-evaluate.
    ///
    /// # Returns
    ///
    /// `false` if `id` does not hold a `C`.
    pub fn touch<C: Component>(&mut self, id: EntityId) -> bool {
        let Some(type_id) = self.registry.id_of::<C>() else {
            return false;
        };
        if !self.has_component(id, type_id) {
            return false;
        }
        self.modified.insert(type_id.slot());
        self.outbox.push(PresenceChange::added(id, type_id));
        true
    }

    /// Borrows the whole column of `C`.
    #[must_use]
    pub fn storage<C: Component>(&self) -> Option<&ComponentStorage<C>> {
        let type_id = self.registry.id_of::<C>()?;
        self.column::<C>(type_id)
    }

    /// Takes the queued presence changes, oldest first.
    pub fn drain_changes(&mut self) -> std::vec::Drain<'_, PresenceChange> {
        self.outbox.drain(..)
    }

    /// Takes the ids spawned since the last drain, oldest first.
    pub fn drain_spawned(&mut self) -> std::vec::Drain<'_, EntityId> {
        self.spawned.drain(..)
    }

    /// Takes the ids despawned since the last drain, oldest first.
    pub fn drain_despawned(&mut self) -> std::vec::Drain<'_, EntityId> {
        self.despawned.drain(..)
    }

    /// Number of queued presence changes.
    #[inline]
    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.outbox.len()
    }

    /// Takes the set of types whose values were modified.
    pub fn take_modified(&mut self) -> Vec<ComponentTypeId> {
        let types = self
            .modified
            .iter()
            .map(|slot| ComponentTypeId::new(slot as u32))
            .collect();
        self.modified.clear();
        types
    }

    /// Makes ids despawned since the last call reusable.
    pub fn release_pending(&mut self) -> usize {
        self.entities.release_pending()
    }

    fn column<C: Component>(&self, type_id: ComponentTypeId) -> Option<&ComponentStorage<C>> {
        self.columns
            .get(type_id.slot())?
            .as_any()
            .downcast_ref::<ComponentStorage<C>>()
    }

    fn column_mut<C: Component>(
        &mut self,
        type_id: ComponentTypeId,
    ) -> Option<&mut ComponentStorage<C>> {
        self.columns
            .get_mut(type_id.slot())?
            .as_any_mut()
            .downcast_mut::<ComponentStorage<C>>()
    }
}

impl ComponentSource for ComponentStore {
    fn has_component(&self, entity: EntityId, type_id: ComponentTypeId) -> bool {
        self.columns
            .get(type_id.slot())
            .is_some_and(|column| column.contains(entity))
    }

    fn component(&self, entity: EntityId, type_id: ComponentTypeId) -> Option<&dyn Any> {
        self.columns.get(type_id.slot())?.value(entity)
    }

    fn type_count(&self) -> usize {
        self.registry.type_count()
    }

    fn for_each_entity(&self, f: &mut dyn FnMut(EntityId)) {
        self.entities.iter_alive().for_each(f);
    }
}

impl std::fmt::Debug for ComponentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentStore")
            .field("alive", &self.entities.alive_count())
            .field("types", &self.registry.type_count())
            .field("pending_changes", &self.outbox.len())
            .field("spawned", &self.spawned.len())
            .field("despawned", &self.despawned.len())
            .finish_non_exhaustive()
    }
}
