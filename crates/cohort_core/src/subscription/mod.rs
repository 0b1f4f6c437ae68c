//! # Entity Subscriptions
//!
//! Decides which entities each processing unit sees, keeps that set correct
//! as components come and go, and hands out cheap, optionally sorted
//! iteration sequences.
//!
//! ## Data Flow
//!
//! ```text
//! component mutation
//!   -> PresenceChange queued
//!   -> SubscriptionManager::step drains (filtered by type id)
//!   -> EntitySubscription membership update
//!   -> views: add / deferred remove, order marked dirty
//!   -> next read reconciles lazily
//! ```
//!
//! ## Failure Model
//!
//! Bookkeeping that contradicts itself (an id assumed present but missing,
//! counters disagreeing with bitsets) means memory corruption or a logic
//! bug. It is logged with `tracing::error!` and then panics, naming the
//! subscription or container. It is never surfaced as a recoverable error.

pub mod aspect;
pub mod container;
pub mod entities;
pub mod manager;
pub mod order;
pub(crate) mod sort;
pub mod source;

pub use aspect::{Aspect, AspectCategory, AspectElement, Condition, InstanceValue, Predicate};
pub use container::{IterationContainer, OrderState, RemovalState, ViewId};
pub use entities::{CleanupState, EntitySubscription, SubscriptionId};
pub use manager::{FanOutStats, StepReport, SubscriptionManager};
pub use order::{AbsentPlacement, ComponentOrder, Direction, EntityComparator};
pub use source::{ComponentSource, PresenceChange};
