//! # Memory Primitives
//!
//! Growable bitsets and id arrays shared by subscriptions and containers.
//!
//! ## Design Philosophy
//!
//! Everything is indexed by dense integer ids:
//! - Membership tests are a single bit probe
//! - Storage is pre-sized once, grown geometrically only when exceeded
//! - Clearing keeps the allocation

mod bits;
mod id_array;

pub use bits::{BitVector, Ones};
pub use id_array::IdArray;
