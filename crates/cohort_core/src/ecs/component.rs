//! # Component Types
//!
//! Components are plain data attached to entity ids. Each Rust type is
//! assigned a small dense [`ComponentTypeId`] at registration, stable for the
//! lifetime of the registry.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;

/// Marker trait for ECS components.
///
/// # Example
///
/// ```rust
/// use cohort_core::Component;
///
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// struct Health(u32);
///
/// impl Component for Health {}
/// ```
pub trait Component: Send + Sync + 'static {}

/// Dense component type identifier.
///
/// Always below `2^31` so it fits a packed presence-change record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ComponentTypeId(u32);

impl ComponentTypeId {
    /// Largest representable type id.
    pub const MAX: u32 = (1 << 31) - 1;

    /// Creates a type id from a raw index.
    ///
    /// # Panics
    ///
    /// Panics if `index` exceeds [`ComponentTypeId::MAX`].
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        assert!(index <= Self::MAX, "component type id out of range");
        Self(index)
    }

    /// Returns the raw index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Returns the index as a `usize`, for type-indexed tables.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component type {}", self.0)
    }
}

/// Maps Rust types to dense component type ids.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    ids: HashMap<TypeId, ComponentTypeId>,
    names: Vec<&'static str>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `C`, returning its id. Registering twice returns the same id.
    pub fn register<C: Component>(&mut self) -> ComponentTypeId {
        if let Some(&id) = self.ids.get(&TypeId::of::<C>()) {
            return id;
        }

        let index = u32::try_from(self.names.len()).unwrap_or(u32::MAX);
        let id = ComponentTypeId::new(index);
        self.ids.insert(TypeId::of::<C>(), id);
        self.names.push(type_name::<C>());
        id
    }

    /// Looks up the id of a registered type.
    #[inline]
    #[must_use]
    pub fn id_of<C: Component>(&self) -> Option<ComponentTypeId> {
        self.ids.get(&TypeId::of::<C>()).copied()
    }

    /// Number of registered types. Ids are `0..type_count()`.
    #[inline]
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.names.len()
    }

    /// Rust type name of a registered id, for diagnostics.
    #[must_use]
    pub fn name(&self, id: ComponentTypeId) -> Option<&'static str> {
        self.names.get(id.slot()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position;
    impl Component for Position {}

    struct Velocity;
    impl Component for Velocity {}

    #[test]
    fn test_register_is_dense_and_idempotent() {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register::<Position>();
        let vel = registry.register::<Velocity>();

        assert_eq!(pos.index(), 0);
        assert_eq!(vel.index(), 1);
        assert_eq!(registry.register::<Position>(), pos);
        assert_eq!(registry.type_count(), 2);
    }

    #[test]
    fn test_lookup_and_names() {
        let mut registry = ComponentRegistry::new();
        assert_eq!(registry.id_of::<Position>(), None);

        let pos = registry.register::<Position>();
        assert_eq!(registry.id_of::<Position>(), Some(pos));
        assert!(registry.name(pos).is_some_and(|n| n.ends_with("Position")));
        assert_eq!(registry.name(ComponentTypeId::new(7)), None);
    }
}
