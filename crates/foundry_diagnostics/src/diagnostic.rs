//! Structured diagnostic messages.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};

/// A structured diagnostic about the code being transformed.
///
/// Diagnostics point at a declaration by full name rather than at a source
/// span, since the syntax tree arrives already decompiled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The code identifying the kind of diagnostic.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// Full name of the enclosing declaration, if known.
    pub declaration: Option<String>,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
    /// Actionable suggestions.
    pub help: Vec<String>,
}

impl Diagnostic {
    fn with_severity(severity: Severity, code: DiagnosticCode, message: String) -> Self {
        Self {
            severity,
            code,
            message,
            declaration: None,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Creates a new error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message.into())
    }

    /// Creates a new warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message.into())
    }

    /// Attaches the enclosing declaration.
    pub fn in_declaration(mut self, declaration: impl Into<String>) -> Self {
        self.declaration = Some(declaration.into());
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help message to this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }

    /// Returns the `(code, message)` pair stored in generated artifacts.
    pub fn to_pair(&self) -> (String, String) {
        let message = match &self.declaration {
            Some(decl) => format!("{} (in `{decl}`)", self.message),
            None => self.message.clone(),
        };
        (self.code.to_string(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;

    #[test]
    fn create_warning() {
        let diag = Diagnostic::warning(DiagnosticCode::new(Category::Warning, 301), "slow");
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.message, "slow");
        assert!(diag.declaration.is_none());
    }

    #[test]
    fn builder_methods() {
        let diag = Diagnostic::error(DiagnosticCode::new(Category::Error, 1), "bad")
            .in_declaration("M::Run")
            .with_note("n")
            .with_help("h");
        assert_eq!(diag.declaration.as_deref(), Some("M::Run"));
        assert_eq!(diag.notes, vec!["n"]);
        assert_eq!(diag.help, vec!["h"]);
    }

    #[test]
    fn pair_includes_declaration() {
        let diag = Diagnostic::warning(DiagnosticCode::new(Category::Warning, 302), "shared port")
            .in_declaration("M::Worker");
        assert_eq!(
            diag.to_pair(),
            ("W302".to_string(), "shared port (in `M::Worker`)".to_string())
        );
    }
}
