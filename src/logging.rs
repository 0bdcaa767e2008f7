// src/logging.rs

//! `tracing` subscriber for the `assetdag` binary.
//!
//! The level comes from `--log-level`, else from `ASSETDAG_LOG`, else
//! `info`. Everything goes to stderr; `list` output owns stdout.

use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Environment variable consulted when `--log-level` is absent.
pub const LOG_ENV: &str = "ASSETDAG_LOG";

impl From<LogLevel> for Level {
    fn from(lvl: LogLevel) -> Self {
        match lvl {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let level = effective_level(cli_level, env.as_deref());

    fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

/// Unparseable `ASSETDAG_LOG` values fall back to `info`.
fn effective_level(cli_level: Option<LogLevel>, env: Option<&str>) -> Level {
    if let Some(lvl) = cli_level {
        return lvl.into();
    }
    env.and_then(|raw| match raw.trim() {
        s if s.eq_ignore_ascii_case("warning") => Some(Level::WARN),
        s => s.parse().ok(),
    })
    .unwrap_or(Level::INFO)
}
