//! Diagnostic codes and helpers for transformation warnings.
//!
//! Warning codes `W301`--`W303` cover findings that do not stop the run.

use foundry_diagnostics::{Category, Diagnostic, DiagnosticCode};

/// A member running in several parallel replicas touches shared memory.
pub const W301: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 301,
};

/// A loop has no reachable exit.
pub const W302: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 302,
};

/// An entry-point selector matched no public method.
pub const W303: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 303,
};

/// Creates a W301 warning for a replicated member accessing shared memory.
pub fn warning_replicated_memory_access(member: &str, replicas: u32) -> Diagnostic {
    Diagnostic::warning(
        W301,
        format!("`{member}` runs in {replicas} parallel replicas and accesses shared memory"),
    )
    .in_declaration(member)
    .with_note("the memory port is not arbitrated; replicas must not access it in the same cycle")
}

/// Creates a W302 warning for a loop that never exits.
pub fn warning_endless_loop(member: &str) -> Diagnostic {
    Diagnostic::warning(W302, "loop never exits; the member never finishes").in_declaration(member)
}

/// Creates a W303 warning for an entry-point selector without matches.
pub fn warning_unmatched_selector(selector: &str) -> Diagnostic {
    Diagnostic::warning(W303, format!("entry-point selector `{selector}` matched no public method"))
}
