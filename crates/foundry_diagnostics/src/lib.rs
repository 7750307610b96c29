//! Diagnostic creation, severity management, and rendering.
//!
//! Non-fatal findings of a transformation run (warnings) are structured
//! [`Diagnostic`] values collected in a thread-safe [`DiagnosticSink`] and
//! carried into the generated artifact as `(code, message)` pairs.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
