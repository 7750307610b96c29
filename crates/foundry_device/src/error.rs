//! Error types for device loading.

use thiserror::Error;

/// Errors raised while loading a device description.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No built-in device has the requested name.
    #[error("unknown device `{name}`; known devices: {known}")]
    UnknownDevice {
        /// The requested name.
        name: String,
        /// Comma-separated list of built-in device names.
        known: String,
    },

    /// A timing report line could not be parsed.
    #[error("timing report line {line}: {message}")]
    TimingParse {
        /// One-based line number.
        line: usize,
        /// What was wrong.
        message: String,
    },
}
