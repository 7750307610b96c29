//! Parsing and validation of `foundry.toml` project configuration files.
//!
//! This crate reads the project configuration and produces the strongly-typed
//! [`ProjectConfig`] plus the [`TransformerConfig`]: the subset of settings
//! that affects generated hardware and therefore participates in cache keys.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod transformer;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use transformer::{EntryPointSelector, TransformerConfig, DEFAULT_DEVICE};
pub use types::*;
