//! Shared foundational types used across the Foundry compiler.
//!
//! This crate provides content hashing for cache keys, clock frequencies with
//! cycle arithmetic, and the internal-error result type.

#![warn(missing_docs)]

pub mod frequency;
pub mod hash;
pub mod result;

pub use frequency::{Frequency, ParseFrequencyError};
pub use hash::{ContentHash, ContentHasher};
pub use result::{FoundryResult, InternalError};
