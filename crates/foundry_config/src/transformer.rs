//! The code-generation-affecting configuration of a transformation run.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Device used when the configuration names none.
pub const DEFAULT_DEVICE: &str = "Nexys A7-100T";

/// Selects entry-point methods by full name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntryPointSelector {
    /// Matches exactly one full member name.
    Exact(String),
    /// Matches every full member name starting with the prefix.
    Prefix(String),
}

impl EntryPointSelector {
    /// Returns `true` if the member full name is selected.
    pub fn matches(&self, full_name: &str) -> bool {
        match self {
            EntryPointSelector::Exact(name) => name == full_name,
            EntryPointSelector::Prefix(prefix) => full_name.starts_with(prefix.as_str()),
        }
    }
}

impl fmt::Display for EntryPointSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPointSelector::Exact(name) => f.write_str(name),
            EntryPointSelector::Prefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}

/// Settings that change the generated hardware.
///
/// Everything in here is hashed into the transformation context Id, so two
/// runs share a cache entry only if they agree on all of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerConfig {
    /// Entry-point selection, in configuration order.
    pub entry_points: Vec<EntryPointSelector>,
    /// Target device name.
    pub device: String,
    /// Static array lengths keyed by holder name.
    pub array_lengths: BTreeMap<String, u32>,
    /// Degree of parallelism keyed by invoked member full name.
    pub parallelism: BTreeMap<String, u32>,
}

impl TransformerConfig {
    /// Creates an empty configuration targeting the given device.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            entry_points: Vec::new(),
            device: device.into(),
            array_lengths: BTreeMap::new(),
            parallelism: BTreeMap::new(),
        }
    }

    /// Selects an entry point by exact full name.
    pub fn with_entry_point(mut self, full_name: impl Into<String>) -> Self {
        self.entry_points
            .push(EntryPointSelector::Exact(full_name.into()));
        self
    }

    /// Selects entry points by full-name prefix.
    pub fn with_entry_point_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.entry_points
            .push(EntryPointSelector::Prefix(prefix.into()));
        self
    }

    /// Fixes the length of an array holder.
    pub fn with_array_length(mut self, holder: impl Into<String>, length: u32) -> Self {
        self.array_lengths.insert(holder.into(), length);
        self
    }

    /// Sets the degree of parallelism for an invoked member.
    pub fn with_parallelism(mut self, member: impl Into<String>, degree: u32) -> Self {
        self.parallelism.insert(member.into(), degree);
        self
    }

    /// Returns `true` if any selector matches the member.
    pub fn is_entry_point(&self, full_name: &str) -> bool {
        self.entry_points.iter().any(|s| s.matches(full_name))
    }

    /// Checks value ranges that the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.trim().is_empty() {
            return Err(ConfigError::MissingField("transform.device".to_string()));
        }
        for selector in &self.entry_points {
            let text = match selector {
                EntryPointSelector::Exact(s) | EntryPointSelector::Prefix(s) => s,
            };
            if text.is_empty() {
                return Err(ConfigError::ValidationError(
                    "entry-point selectors must not be empty".to_string(),
                ));
            }
        }
        if let Some((holder, _)) = self.array_lengths.iter().find(|(_, len)| **len == 0) {
            return Err(ConfigError::ValidationError(format!(
                "array length of `{holder}` must be positive"
            )));
        }
        if let Some((member, _)) = self.parallelism.iter().find(|(_, deg)| **deg == 0) {
            return Err(ConfigError::ValidationError(format!(
                "degree of parallelism of `{member}` must be positive"
            )));
        }
        Ok(())
    }
}

impl TryFrom<&ProjectConfig> for TransformerConfig {
    type Error = ConfigError;

    fn try_from(config: &ProjectConfig) -> Result<Self, Self::Error> {
        let section = &config.transform;
        let mut entry_points: Vec<EntryPointSelector> = section
            .entry_points
            .iter()
            .cloned()
            .map(EntryPointSelector::Exact)
            .collect();
        entry_points.extend(
            section
                .entry_point_prefixes
                .iter()
                .cloned()
                .map(EntryPointSelector::Prefix),
        );
        let transformer = TransformerConfig {
            entry_points,
            device: section
                .device
                .clone()
                .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            array_lengths: section.array_lengths.clone(),
            parallelism: section.parallelism.clone(),
        };
        transformer.validate()?;
        Ok(transformer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_prefix_matching() {
        let exact = EntryPointSelector::Exact("Ns.M::Run".to_string());
        assert!(exact.matches("Ns.M::Run"));
        assert!(!exact.matches("Ns.M::Run2"));

        let prefix = EntryPointSelector::Prefix("Ns.Kernels.".to_string());
        assert!(prefix.matches("Ns.Kernels.Add::Run"));
        assert!(!prefix.matches("Ns.Other::Run"));
    }

    #[test]
    fn builder_collects_settings() {
        let config = TransformerConfig::new("Nexys A7-100T")
            .with_entry_point("M::Run")
            .with_entry_point_prefix("K.")
            .with_array_length("M::Run.buffer", 8)
            .with_parallelism("M::Worker", 4);
        assert!(config.is_entry_point("M::Run"));
        assert!(config.is_entry_point("K.Filter::Apply"));
        assert_eq!(config.array_lengths["M::Run.buffer"], 8);
        assert_eq!(config.parallelism["M::Worker"], 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_degree_rejected() {
        let config = TransformerConfig::new("dev").with_parallelism("M::Worker", 0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn zero_length_rejected() {
        let config = TransformerConfig::new("dev").with_array_length("M::Run.a", 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_device_rejected() {
        let config = TransformerConfig::new("  ");
        assert!(matches!(config.validate(), Err(ConfigError::MissingField(_))));
    }
}
