//! Input selection configuration.
//!
//! Decides which sub-tree of each unflattened schema is analyzed. A global
//! `json_path` applies by default; an optional per-event-type table may
//! override it, restricted to a fixed set of paths. Whenever a table is
//! configured, `track` events always use `$.properties`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default path analyzed when nothing else is configured.
pub const DEFAULT_JSON_PATH: &str = "$.properties";

/// Paths an event-type mapping may point at.
pub const ALLOWED_EVENT_TYPE_PATHS: &[&str] = &["$.properties", "$.traits", "$.context.traits"];

const TRACK_EVENT_TYPE: &str = "track";

/// Extraction settings, loadable from YAML.
///
/// ```yaml
/// json_path: $.properties
/// skip_failed: true
/// event_type_paths:
///   identify: $.context.traits
///   group: $.traits
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Path applied to event types without a mapping.
    pub json_path: String,

    /// Drop schemas whose path does not resolve instead of analyzing the
    /// whole tree.
    pub skip_failed: bool,

    /// Per-event-type path overrides.
    pub event_type_paths: BTreeMap<String, String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            json_path: DEFAULT_JSON_PATH.to_string(),
            skip_failed: false,
            event_type_paths: BTreeMap::new(),
        }
    }
}

impl ExtractionConfig {
    /// Parse and validate a YAML configuration.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ExtractionConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Check every event-type mapping against [`ALLOWED_EVENT_TYPE_PATHS`].
    pub fn validate(&self) -> Result<()> {
        for (event_type, path) in &self.event_type_paths {
            let path = path.trim();
            if !ALLOWED_EVENT_TYPE_PATHS.contains(&path) {
                return Err(Error::ConfigValidation(format!(
                    "event type '{event_type}' maps to '{path}' (allowed: {})",
                    ALLOWED_EVENT_TYPE_PATHS.join(", ")
                )));
            }
            if event_type.trim() == TRACK_EVENT_TYPE && path != DEFAULT_JSON_PATH {
                return Err(Error::ConfigValidation(format!(
                    "event type 'track' must use '{DEFAULT_JSON_PATH}', got '{path}'"
                )));
            }
        }
        Ok(())
    }

    /// The path to analyze for schemas of `event_type`.
    pub fn path_for(&self, event_type: &str) -> &str {
        if self.event_type_paths.is_empty() {
            return &self.json_path;
        }
        let event_type = event_type.trim();
        if event_type == TRACK_EVENT_TYPE {
            return DEFAULT_JSON_PATH;
        }
        self.event_type_paths
            .get(event_type)
            .map(|p| p.trim())
            .unwrap_or(self.json_path.as_str())
    }
}
