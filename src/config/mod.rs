//! Configuration for taskwell.
//!
//! Preferences live in `config.kdl` files at two levels:
//! - System: `~/.config/taskwell/config.kdl` (or `$TW_CONFIG_DIR/config.kdl`)
//! - Session: `<data>/taskwell/<repo-hash>/config.kdl`
//!
//! Contains:
//! - `complexity-threshold` - Default threshold for complexity analysis (1-10)
//! - `suggest-breakdown` - Whether analysis proposes breakdowns by default
//! - `log-level` - Log filter used when `TW_LOG` is unset
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, Resolved, ResolvedConfig, ValueSource, resolve_config, resolve_layers,
    resolve_system_config,
};
pub use schema::TaskwellConfig;
