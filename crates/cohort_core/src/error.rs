//! # Error Types
//!
//! Recoverable errors only. Corrupted subscription or container state is not
//! an error value: it aborts the offending operation (see the `subscription`
//! module docs).

use crate::ecs::EntityId;
use crate::subscription::{AspectCategory, SubscriptionId, ViewId};
use std::io;
use thiserror::Error;

/// Errors raised while constructing an [`Aspect`](crate::Aspect).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AspectError {
    /// The same component type appears twice, within or across categories.
    #[error("component type {type_id} appears in both {first} and {second}")]
    DuplicateType {
        /// Raw id of the repeated component type.
        type_id: u32,
        /// Category of the first occurrence.
        first: AspectCategory,
        /// Category of the repeated occurrence.
        second: AspectCategory,
    },

    /// The same condition object appears twice.
    #[error("condition {condition} appears in both {first} and {second}")]
    DuplicateCondition {
        /// Debug rendering of the repeated condition.
        condition: String,
        /// Category of the first occurrence.
        first: AspectCategory,
        /// Category of the repeated occurrence.
        second: AspectCategory,
    },
}

/// Errors raised while loading a [`SubscriptionConfig`](crate::SubscriptionConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config parsed but holds unusable values.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by the [`World`](crate::World) facade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// The component type was never registered.
    #[error("component type not registered: {0}")]
    UnregisteredComponent(&'static str),

    /// The entity is not alive.
    #[error("entity {0} is not alive")]
    DeadEntity(EntityId),

    /// The subscription id was not issued by this world.
    #[error("unknown subscription: {0}")]
    UnknownSubscription(SubscriptionId),

    /// The view id was not issued by this world.
    #[error("unknown view: {0}")]
    UnknownView(ViewId),
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
