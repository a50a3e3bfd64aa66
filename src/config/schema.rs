//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The `TaskwellConfig` struct mirroring the file
//! - Conversion to and from KDL documents
//! - Validation

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

/// Log levels accepted by `log-level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// complexity-threshold 7
/// suggest-breakdown #true
/// log-level "info"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskwellConfig {
    /// Default score at or above which tasks count as complex (1-10)
    pub complexity_threshold: Option<i32>,

    /// Whether analysis proposes breakdowns unless told otherwise
    pub suggest_breakdown: Option<bool>,

    /// Log filter used when `TW_LOG` is not set
    pub log_level: Option<String>,
}

impl TaskwellConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(threshold) = self.complexity_threshold {
            if !(1..=10).contains(&threshold) {
                return Err(format!(
                    "complexity-threshold must be 1-10, got {}",
                    threshold
                ));
            }
        }
        if let Some(ref level) = self.log_level {
            if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(format!(
                    "log-level must be one of {}, got {}",
                    LOG_LEVELS.join(", "),
                    level
                ));
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    ///
    /// Unknown nodes are ignored; values of the wrong type are treated as unset.
    /// Ranges are not checked here, see `validate`.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(node) = doc.get("complexity-threshold") {
            if let Some(entry) = node.entries().first() {
                config.complexity_threshold = entry
                    .value()
                    .as_integer()
                    .and_then(|i| i32::try_from(i).ok());
            }
        }

        if let Some(node) = doc.get("suggest-breakdown") {
            if let Some(entry) = node.entries().first() {
                config.suggest_breakdown = entry.value().as_bool();
            }
        }

        if let Some(node) = doc.get("log-level") {
            if let Some(entry) = node.entries().first() {
                if let Some(s) = entry.value().as_string() {
                    config.log_level = Some(s.to_string());
                }
            }
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(threshold) = self.complexity_threshold {
            let mut node = KdlNode::new("complexity-threshold");
            node.push(KdlEntry::new(KdlValue::Integer(threshold as i128)));
            doc.nodes_mut().push(node);
        }

        if let Some(suggest) = self.suggest_breakdown {
            let mut node = KdlNode::new("suggest-breakdown");
            node.push(KdlEntry::new(KdlValue::Bool(suggest)));
            doc.nodes_mut().push(node);
        }

        if let Some(ref level) = self.log_level {
            let mut node = KdlNode::new("log-level");
            node.push(KdlEntry::new(KdlValue::String(level.clone())));
            doc.nodes_mut().push(node);
        }

        doc
    }
}
