//! Human-readable diagnostic rendering.

use crate::diagnostic::Diagnostic;

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// ```text
/// warning[W301]: member `M::Worker` is replicated 4 times and accesses memory
///   --> in M::Worker
///    = note: ...
/// ```
pub struct TerminalRenderer;

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = format!("{}[{}]: {}\n", diag.severity, diag.code, diag.message);
        if let Some(decl) = &diag.declaration {
            out.push_str(&format!("  --> in {decl}\n"));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};

    #[test]
    fn render_full() {
        let diag = Diagnostic::warning(DiagnosticCode::new(Category::Warning, 301), "careful")
            .in_declaration("M::Run")
            .with_note("a note")
            .with_help("a hint");
        let out = TerminalRenderer.render(&diag);
        assert!(out.starts_with("warning[W301]: careful\n"));
        assert!(out.contains("--> in M::Run"));
        assert!(out.contains("= note: a note"));
        assert!(out.contains("= help: a hint"));
    }

    #[test]
    fn render_minimal() {
        let diag = Diagnostic::error(DiagnosticCode::new(Category::Error, 1), "boom");
        assert_eq!(TerminalRenderer.render(&diag), "error[E001]: boom\n");
    }
}
