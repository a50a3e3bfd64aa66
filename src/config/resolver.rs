//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags or tool arguments (passed at runtime)
//! 2. Session config.kdl (`<data>/taskwell/<repo-hash>/config.kdl`)
//! 3. System config.kdl (`~/.config/taskwell/config.kdl`)
//! 4. Built-in defaults

use crate::Result;
use crate::config::TaskwellConfig;
use crate::models::complexity::thresholds;
use crate::storage::Storage;

/// Default log filter when nothing else is configured.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag or tool argument
    CliFlag,
    /// Value from session-level config
    Session,
    /// Value from system-level config
    System,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Session => write!(f, "session"),
            ValueSource::System => write!(f, "system"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Complexity threshold for analysis
    pub complexity_threshold: Resolved<i32>,
    /// Whether analysis proposes breakdowns
    pub suggest_breakdown: Resolved<bool>,
    /// Log filter
    pub log_level: Resolved<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            complexity_threshold: Resolved::new(
                thresholds::DEFAULT_THRESHOLD,
                ValueSource::Default,
            ),
            suggest_breakdown: Resolved::new(true, ValueSource::Default),
            log_level: Resolved::new(DEFAULT_LOG_LEVEL.to_string(), ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    /// Get the complexity threshold value.
    pub fn complexity_threshold(&self) -> i32 {
        self.complexity_threshold.value
    }

    /// Get the suggest-breakdown value.
    pub fn suggest_breakdown(&self) -> bool {
        self.suggest_breakdown.value
    }

    /// Get the log level value.
    pub fn log_level(&self) -> &str {
        &self.log_level.value
    }
}

/// Runtime overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Complexity threshold override
    pub complexity_threshold: Option<i32>,
    /// Suggest-breakdown override
    pub suggest_breakdown: Option<bool>,
    /// Log level override
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set complexity threshold override.
    pub fn with_complexity_threshold(mut self, threshold: i32) -> Self {
        self.complexity_threshold = Some(threshold);
        self
    }

    /// Set suggest-breakdown override.
    pub fn with_suggest_breakdown(mut self, suggest: bool) -> Self {
        self.suggest_breakdown = Some(suggest);
        self
    }

    /// Set log level override.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }
}

/// Resolve configuration from already-loaded config layers.
pub fn resolve_layers(
    system: &TaskwellConfig,
    session: &TaskwellConfig,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let mut result = ResolvedConfig::default();

    if let Some(threshold) = overrides.complexity_threshold {
        result.complexity_threshold = Resolved::new(threshold, ValueSource::CliFlag);
    } else if let Some(threshold) = session.complexity_threshold {
        result.complexity_threshold = Resolved::new(threshold, ValueSource::Session);
    } else if let Some(threshold) = system.complexity_threshold {
        result.complexity_threshold = Resolved::new(threshold, ValueSource::System);
    }

    if let Some(suggest) = overrides.suggest_breakdown {
        result.suggest_breakdown = Resolved::new(suggest, ValueSource::CliFlag);
    } else if let Some(suggest) = session.suggest_breakdown {
        result.suggest_breakdown = Resolved::new(suggest, ValueSource::Session);
    } else if let Some(suggest) = system.suggest_breakdown {
        result.suggest_breakdown = Resolved::new(suggest, ValueSource::System);
    }

    if let Some(ref level) = overrides.log_level {
        result.log_level = Resolved::new(level.clone(), ValueSource::CliFlag);
    } else if let Some(ref level) = session.log_level {
        result.log_level = Resolved::new(level.clone(), ValueSource::Session);
    } else if let Some(ref level) = system.log_level {
        result.log_level = Resolved::new(level.clone(), ValueSource::System);
    }

    result
}

/// Resolve configuration with full precedence chain for a working directory.
pub fn resolve_config(storage: &Storage, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system_config = Storage::read_system_config()?;
    let session_config = storage.read_config()?;
    Ok(resolve_layers(&system_config, &session_config, overrides))
}

/// Resolve configuration without a working directory (system config only).
pub fn resolve_system_config(overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system_config = Storage::read_system_config()?;
    Ok(resolve_layers(
        &system_config,
        &TaskwellConfig::default(),
        overrides,
    ))
}
