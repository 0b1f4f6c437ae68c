//! # Entity Component System
//!
//! Ids, component types, a reference component store and the [`World`]
//! facade that wires the store to the subscription manager.
//!
//! ## Design Philosophy
//!
//! - Entity ids are dense indices; id `0` is the reserved sentinel
//! - Components live in id-indexed columns, one per registered type
//! - Mutations are queued and applied at one synchronization point per tick

mod component;
mod entity;
mod storage;
mod world;

pub use component::{Component, ComponentRegistry, ComponentTypeId};
pub use entity::{EntityAllocator, EntityId};
pub use storage::{ComponentStorage, ComponentStore};
pub use world::World;
