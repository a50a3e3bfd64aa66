//! Taskwell - project, task and memory tracking for AI agents.
//!
//! This library provides the core functionality for the `tw` CLI tool and
//! its MCP server, including record storage, complexity analysis and
//! next-task recommendation.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod mcp;
pub mod models;
pub mod storage;

/// Version string with commit and build time, shown by `tw --version`.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("TW_GIT_COMMIT"),
    ", built ",
    env!("TW_BUILD_TIMESTAMP"),
    ")"
);


/// Library-level error type for taskwell operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Kdl(#[from] kdl::KdlError),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for taskwell operations.
pub type Result<T> = std::result::Result<T, Error>;
