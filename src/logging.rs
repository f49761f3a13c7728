// src/logging.rs

//! Logging setup for `console-runner` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided), applied to every target
//! 2. `CONSOLE_RUNNER_LOG` environment variable: either a bare level
//!    ("debug") or full `EnvFilter` directives
//!    ("console_runner::exec=trace,warn")
//! 3. default to `info`
//!
//! Logs go to STDERR; stdout carries only the console log of the command
//! being run, so it can be piped.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "CONSOLE_RUNNER_LOG";

/// Initialise global logging subscriber.
///
/// Call once at startup; a second call returns an error.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(LOG_ENV_VAR).ok().as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("installing tracing subscriber: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>, env_value: Option<&str>) -> EnvFilter {
    if let Some(lvl) = cli_level {
        return EnvFilter::new(directive_for(lvl));
    }

    match env_value.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => match parse_level_str(raw) {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_new(raw).unwrap_or_else(|_| EnvFilter::new("info")),
        },
        None => EnvFilter::new("info"),
    }
}

fn directive_for(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

/// Accept a bare level name, returning its canonical directive.
fn parse_level_str(s: &str) -> Option<&'static str> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some("error"),
        "warn" | "warning" => Some("warn"),
        "info" => Some("info"),
        "debug" => Some("debug"),
        "trace" => Some("trace"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_strings_are_case_insensitive() {
        assert_eq!(parse_level_str(" Debug "), Some("debug"));
        assert_eq!(parse_level_str("warning"), Some("warn"));
        assert_eq!(parse_level_str("loud"), None);
    }

    #[test]
    fn cli_level_wins_over_env() {
        let filter = build_filter(Some(LogLevel::Trace), Some("error"));
        assert_eq!(filter.to_string(), "trace");
    }

    #[test]
    fn env_directives_are_accepted() {
        let filter = build_filter(None, Some("console_runner::exec=debug,warn"));
        let rendered = filter.to_string();
        assert!(rendered.contains("console_runner::exec=debug"));
        assert!(rendered.contains("warn"));
    }

    #[test]
    fn empty_env_falls_back_to_info() {
        assert_eq!(build_filter(None, Some("  ")).to_string(), "info");
    }
}
