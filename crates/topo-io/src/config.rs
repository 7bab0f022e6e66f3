//! Orchestrator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use topo_model::DEFAULT_KIND;

/// Configuration of a [`TopologyIo`](crate::TopologyIo) session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyIoConfig {
    /// Kind written for nodes added without one
    pub default_kind: String,
    /// How long a cached sidecar is served without re-reading, in milliseconds
    pub annotation_freshness_ms: u64,
    /// How long after a write file-change notifications should be ignored, in milliseconds
    pub suppression_window_ms: u64,
    /// Appended to the topology file name to find its sidecar
    pub annotation_suffix: String,
    /// Indentation step of freshly generated YAML blocks
    pub indent: usize,
    /// Fail edits of missing nodes instead of creating them
    pub strict_edit: bool,
}

impl TopologyIoConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from YAML text; missing fields take their defaults
    ///
    /// # Errors
    /// Returns the YAML error for malformed input
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// With default kind
    #[inline]
    #[must_use]
    pub fn with_default_kind(mut self, kind: impl Into<String>) -> Self {
        self.default_kind = kind.into();
        self
    }

    /// With annotation freshness window
    #[inline]
    #[must_use]
    pub fn with_annotation_freshness(mut self, window: Duration) -> Self {
        self.annotation_freshness_ms = duration_ms(window);
        self
    }

    /// With external-change suppression window
    #[inline]
    #[must_use]
    pub fn with_suppression_window(mut self, window: Duration) -> Self {
        self.suppression_window_ms = duration_ms(window);
        self
    }

    /// With sidecar suffix
    #[inline]
    #[must_use]
    pub fn with_annotation_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.annotation_suffix = suffix.into();
        self
    }

    /// With indentation step
    #[inline]
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// With strict node edits
    #[inline]
    #[must_use]
    pub fn with_strict_edit(mut self, strict: bool) -> Self {
        self.strict_edit = strict;
        self
    }

    /// Annotation freshness window
    #[inline]
    #[must_use]
    pub fn annotation_freshness(&self) -> Duration {
        Duration::from_millis(self.annotation_freshness_ms)
    }

    /// External-change suppression window
    #[inline]
    #[must_use]
    pub fn suppression_window(&self) -> Duration {
        Duration::from_millis(self.suppression_window_ms)
    }
}

fn duration_ms(window: Duration) -> u64 {
    u64::try_from(window.as_millis()).unwrap_or(u64::MAX)
}

impl Default for TopologyIoConfig {
    fn default() -> Self {
        Self {
            default_kind: DEFAULT_KIND.to_string(),
            annotation_freshness_ms: 1_000,
            suppression_window_ms: 1_000,
            annotation_suffix: topo_annotations::DEFAULT_SUFFIX.to_string(),
            indent: topo_yaml::DEFAULT_INDENT,
            strict_edit: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TopologyIoConfig::default();
        assert_eq!(config.default_kind, "nokia_srlinux");
        assert_eq!(config.annotation_freshness(), Duration::from_secs(1));
        assert_eq!(config.suppression_window(), Duration::from_secs(1));
        assert_eq!(config.annotation_suffix, ".annotations.json");
        assert_eq!(config.indent, 2);
        assert!(!config.strict_edit);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = TopologyIoConfig::from_yaml_str("strict_edit: true\nindent: 4\n").unwrap();
        assert!(config.strict_edit);
        assert_eq!(config.indent, 4);
        assert_eq!(config.default_kind, "nokia_srlinux");
        assert_eq!(TopologyIoConfig::from_yaml_str("").unwrap(), TopologyIoConfig::default());
    }

    #[test]
    fn builders() {
        let config = TopologyIoConfig::new()
            .with_default_kind("linux")
            .with_suppression_window(Duration::from_millis(250))
            .with_strict_edit(true);
        assert_eq!(config.default_kind, "linux");
        assert_eq!(config.suppression_window_ms, 250);
        assert!(config.strict_edit);
    }
}
