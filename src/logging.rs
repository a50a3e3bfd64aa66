//! Tracing setup for the `tw` binary.
//!
//! Logs always go to stderr: stdout carries command output and, under
//! `tw mcp serve`, the JSON-RPC stream.

use crate::config::{Resolved, ValueSource};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "TW_LOG";

/// Pick the filter directive.
///
/// `--log-level` wins, then `TW_LOG`, then the level from config files.
pub fn filter_directive(level: &Resolved<String>) -> String {
    if level.source == ValueSource::CliFlag {
        return level.value.clone();
    }
    match std::env::var(LOG_ENV) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => level.value.clone(),
    }
}

/// Install the global subscriber.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_logging(level: &Resolved<String>) {
    let directive = filter_directive(level);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(false),
        )
        .with(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn level(value: &str, source: ValueSource) -> Resolved<String> {
        Resolved::new(value.to_string(), source)
    }

    #[test]
    #[serial]
    fn test_env_overrides_configured_level() {
        // SAFETY: serialized with other env-mutating tests
        unsafe { std::env::set_var(LOG_ENV, "taskwell=debug") };
        assert_eq!(
            filter_directive(&level("warn", ValueSource::Session)),
            "taskwell=debug"
        );
        unsafe { std::env::remove_var(LOG_ENV) };
    }

    #[test]
    #[serial]
    fn test_flag_overrides_env() {
        unsafe { std::env::set_var(LOG_ENV, "taskwell=debug") };
        assert_eq!(filter_directive(&level("error", ValueSource::CliFlag)), "error");
        unsafe { std::env::remove_var(LOG_ENV) };
    }

    #[test]
    #[serial]
    fn test_configured_level_used_without_env() {
        unsafe { std::env::remove_var(LOG_ENV) };
        assert_eq!(filter_directive(&level("info", ValueSource::System)), "info");
    }

    #[test]
    #[serial]
    fn test_init_logging_twice_does_not_panic() {
        init_logging(&level("warn", ValueSource::Default));
        init_logging(&level("debug", ValueSource::CliFlag));
    }
}
