// src/logging.rs

//! Logging setup for `procmux` using `tracing` + `tracing-subscriber`.
//!
//! Log level comes from the `PROCMUX_LOG` environment variable (e.g. "info",
//! "debug"), defaulting to `info`.
//!
//! Logs go to the output router's base writer: stderr for the console
//! backend, the base region for the multi-pane display. The writer is passed
//! in explicitly once the router exists.

use anyhow::{Result, anyhow};
use tracing_subscriber::fmt;

use crate::output::BaseWriter;

pub const LOG_ENV_VAR: &str = "PROCMUX_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(writer: BaseWriter, ansi: bool) -> Result<()> {
    let level = std::env::var(LOG_ENV_VAR)
        .ok()
        .and_then(|s| parse_level_str(&s))
        .unwrap_or(tracing::Level::INFO);

    fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_ansi(ansi)
        .with_writer(writer)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

pub fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(parse_level_str(" Debug "), Some(tracing::Level::DEBUG));
        assert_eq!(parse_level_str("warning"), Some(tracing::Level::WARN));
        assert_eq!(parse_level_str("loud"), None);
    }
}
