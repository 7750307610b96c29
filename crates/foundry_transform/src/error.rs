//! The error taxonomy of a transformation run.
//!
//! Every error aborts the whole run. Configuration problems and unsupported
//! source constructs are the user's to fix; internal consistency errors are
//! compiler defects.

use foundry_common::InternalError;
use foundry_config::ConfigError;
use foundry_device::DeviceError;
use foundry_ir::DesignError;
use foundry_timing::TimingError;
use thiserror::Error;

/// Errors raised by the transformation pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    /// The configuration, device or timing data cannot drive the run.
    #[error("configuration error: {message}")]
    Configuration {
        /// What is missing or invalid.
        message: String,
    },
    /// A reachable construct is outside the compiled subset.
    #[error("unsupported construct in `{declaration}`: {construct}")]
    UnsupportedConstruct {
        /// The offending construct.
        construct: String,
        /// Full name of the enclosing declaration.
        declaration: String,
    },
    /// A downstream invariant was violated.
    #[error("internal consistency error: {message}")]
    InternalConsistency {
        /// The violated invariant.
        message: String,
    },
}

/// The kind of a [`TransformError`], for matching without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`TransformError::Configuration`].
    Configuration,
    /// See [`TransformError::UnsupportedConstruct`].
    UnsupportedConstruct,
    /// See [`TransformError::InternalConsistency`].
    InternalConsistency,
}

impl TransformError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        TransformError::Configuration {
            message: message.into(),
        }
    }

    /// Creates an unsupported-construct error.
    pub fn unsupported(construct: impl Into<String>, declaration: impl Into<String>) -> Self {
        TransformError::UnsupportedConstruct {
            construct: construct.into(),
            declaration: declaration.into(),
        }
    }

    /// Creates an internal consistency error.
    pub fn internal(message: impl Into<String>) -> Self {
        TransformError::InternalConsistency {
            message: message.into(),
        }
    }

    /// The error's kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransformError::Configuration { .. } => ErrorKind::Configuration,
            TransformError::UnsupportedConstruct { .. } => ErrorKind::UnsupportedConstruct,
            TransformError::InternalConsistency { .. } => ErrorKind::InternalConsistency,
        }
    }
}

impl From<InternalError> for TransformError {
    fn from(err: InternalError) -> Self {
        TransformError::internal(err.message)
    }
}

impl From<TimingError> for TransformError {
    fn from(err: TimingError) -> Self {
        TransformError::configuration(err.to_string())
    }
}

impl From<DeviceError> for TransformError {
    fn from(err: DeviceError) -> Self {
        TransformError::configuration(err.to_string())
    }
}

impl From<ConfigError> for TransformError {
    fn from(err: ConfigError) -> Self {
        TransformError::configuration(err.to_string())
    }
}

impl From<DesignError> for TransformError {
    fn from(err: DesignError) -> Self {
        TransformError::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundry_device::{OperatorKind, TimingKey};

    #[test]
    fn display_names_construct_and_declaration() {
        let err = TransformError::unsupported("static mutable field `Count`", "Ns.Counter");
        assert_eq!(
            err.to_string(),
            "unsupported construct in `Ns.Counter`: static mutable field `Count`"
        );
        assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
    }

    #[test]
    fn missing_timing_is_a_configuration_error() {
        let err: TransformError = TimingError::MissingTiming {
            key: TimingKey {
                operator: OperatorKind::Mul,
                width: 64,
                signed: true,
                constant: None,
            },
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("mul on 64-bit signed operands"));
    }

    #[test]
    fn internal_errors_are_consistency_errors() {
        let err: TransformError = InternalError::new("member id missing").into();
        assert_eq!(err.kind(), ErrorKind::InternalConsistency);
    }
}
