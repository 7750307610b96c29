//! The output of a transformation run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Language tag of every generated hardware description.
pub const LANGUAGE: &str = "VHDL";

/// Everything handed to the downstream toolchain and the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareArtifact {
    /// Language of [`source`](Self::source); always [`LANGUAGE`].
    pub language: String,
    /// Entry points and aliases by full name, mapped to the ID the host puts
    /// on the `MemberId` port.
    pub member_ids: BTreeMap<String, u32>,
    /// The hardware description.
    pub source: String,
    /// Multi-cycle path constraints, if any operation needs them.
    pub constraints: Option<String>,
    /// `(code, message)` pairs of every warning, in emission order.
    pub warnings: Vec<(String, String)>,
}

impl HardwareArtifact {
    /// The ID of an entry point or alias.
    pub fn member_id(&self, name: &str) -> Option<u32> {
        self.member_ids.get(name).copied()
    }

    /// Returns `true` if a warning with `code` was raised.
    pub fn has_warning(&self, code: &str) -> bool {
        self.warnings.iter().any(|(c, _)| c == code)
    }
}
