//! # COHORT Core
//!
//! Entity subscriptions and ordered iteration for a data-oriented ECS:
//! - Which entities each processing unit sees, as an interest predicate
//!   ([`Aspect`]) over component presence and values
//! - Membership kept incrementally correct, fanned out only to interested
//!   subscriptions
//! - Iteration sequences with lazy removal and an adaptive sort tuned for
//!   nearly sorted input
//!
//! ## Architecture Rules
//!
//! 1. **One synchronization point per tick** - mutations queue, `step` applies
//! 2. **Work on read** - compaction and sorting happen when a view is read
//! 3. **Corruption aborts** - impossible bookkeeping panics, never limps on
//!
//! ## Example
//!
//! ```rust
//! use cohort_core::{Aspect, Component, World};
//!
//! struct Health(u32);
//! impl Component for Health {}
//!
//! let mut world = World::default();
//! let health = world.register_component::<Health>();
//! let living = world.subscribe(Aspect::from_types(&[health], &[], &[]).unwrap());
//! let view = world.ordered_view(living, None).unwrap();
//!
//! let e = world.spawn();
//! world.insert(e, Health(10)).unwrap();
//! world.step();
//!
//! assert_eq!(world.entities(view).unwrap(), &[e]);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;
pub mod subscription;

pub use config::SubscriptionConfig;
pub use ecs::{
    Component, ComponentRegistry, ComponentStorage, ComponentStore, ComponentTypeId,
    EntityAllocator, EntityId, World,
};
pub use error::{AspectError, ConfigError, WorldError, WorldResult};
pub use memory::{BitVector, IdArray};
pub use subscription::{
    AbsentPlacement, Aspect, AspectCategory, AspectElement, CleanupState, ComponentOrder,
    ComponentSource, Condition, Direction, EntityComparator, EntitySubscription, FanOutStats,
    InstanceValue, IterationContainer, OrderState, Predicate, PresenceChange, RemovalState,
    StepReport, SubscriptionId, SubscriptionManager, ViewId,
};
