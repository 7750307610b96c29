//! Common result and error types for the Foundry compiler.

/// Result type for operations whose only failure mode is a compiler defect.
pub type FoundryResult<T> = Result<T, InternalError>;

/// An internal compiler error: a violated invariant inside Foundry, not bad input.
#[derive(Debug, thiserror::Error)]
#[error("internal compiler error: {message}")]
pub struct InternalError {
    /// Description of the violated invariant.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
