//! # Component Source Contract
//!
//! The subscription layer never owns component data. It reads presence and
//! values through [`ComponentSource`] and learns about mutations through
//! packed [`PresenceChange`] records.

use crate::ecs::{ComponentTypeId, EntityId};
use std::any::Any;
use std::fmt;

/// Read access to component storage, as seen by aspects and comparators.
pub trait ComponentSource {
    /// Returns `true` if `entity` currently has a component of `type_id`.
    fn has_component(&self, entity: EntityId, type_id: ComponentTypeId) -> bool;

    /// Returns the component value, type-erased, if present.
    fn component(&self, entity: EntityId, type_id: ComponentTypeId) -> Option<&dyn Any>;

    /// Number of registered component types.
    fn type_count(&self) -> usize;

    /// Calls `f` for every live entity. The sentinel is not an entity.
    fn for_each_entity(&self, f: &mut dyn FnMut(EntityId));
}

impl<'s> dyn ComponentSource + 's {
    /// Typed component lookup. Returns `None` if absent or of another type.
    #[inline]
    #[must_use]
    pub fn get<C: 'static>(&self, entity: EntityId, type_id: ComponentTypeId) -> Option<&C> {
        self.component(entity, type_id)?.downcast_ref::<C>()
    }
}

/// Packed presence-change record.
///
/// ```text
/// | 63 ........ 32 | 31 ........ 1 |   0   |
/// |   entity id    |   type id     | added |
/// ```
///
/// A set `added` bit also covers "value replaced", which may flip instance
/// and condition elements.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct PresenceChange(u64);

impl PresenceChange {
    /// Component attached (or replaced) on `entity`.
    #[inline]
    #[must_use]
    pub const fn added(entity: EntityId, type_id: ComponentTypeId) -> Self {
        Self::pack(entity, type_id, true)
    }

    /// Component detached from `entity`.
    #[inline]
    #[must_use]
    pub const fn removed(entity: EntityId, type_id: ComponentTypeId) -> Self {
        Self::pack(entity, type_id, false)
    }

    #[inline]
    const fn pack(entity: EntityId, type_id: ComponentTypeId, added: bool) -> Self {
        Self(((entity.index() as u64) << 32) | ((type_id.index() as u64) << 1) | added as u64)
    }

    /// Rebuilds a record from its packed form.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The packed form.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Entity whose component changed.
    #[inline]
    #[must_use]
    pub const fn entity(self) -> EntityId {
        EntityId::new((self.0 >> 32) as u32)
    }

    /// Component type that changed.
    #[inline]
    #[must_use]
    pub const fn component_type(self) -> ComponentTypeId {
        ComponentTypeId::new(((self.0 >> 1) as u32) & ComponentTypeId::MAX)
    }

    /// `true` for attach/replace, `false` for detach.
    #[inline]
    #[must_use]
    pub const fn is_added(self) -> bool {
        self.0 & 1 == 1
    }
}

impl fmt::Debug for PresenceChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenceChange")
            .field("entity", &self.entity())
            .field("component_type", &self.component_type().index())
            .field("added", &self.is_added())
            .finish()
    }
}
