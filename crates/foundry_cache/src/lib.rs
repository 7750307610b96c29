//! Content-addressed storage of hardware artifacts.
//!
//! A transformation run is identified by its context Id. When a store
//! already holds an artifact under that Id, [`cached_transform`] returns it
//! without analysing or transforming anything.

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod manifest;
pub mod store;

pub use cache::{cached_transform, ArtifactCache, CacheOutcome, DiskCache, MemoryCache};
pub use error::CacheError;
pub use manifest::{CacheManifest, ManifestEntry};
