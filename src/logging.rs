//! Structured logging setup.

use anyhow::{Context, Result};
use tracing::{warn, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Parse a log level name. Unknown names yield `None`.
pub fn parse_level(level: &str) -> Option<Level> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Install the global subscriber.
///
/// `level` sets the default verbosity and falls back to `info` when it is
/// not a known level name. Directives in `RUST_LOG` take precedence.
pub fn init(level: &str) -> Result<()> {
    let parsed = parse_level(level);
    let default = LevelFilter::from_level(parsed.unwrap_or(Level::INFO));

    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true).with_level(true))
        .try_init()
        .context("failed to install tracing subscriber")?;

    if parsed.is_none() {
        warn!(level, "Unknown log level, using info");
    }

    Ok(())
}
