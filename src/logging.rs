//! Tracing infrastructure.
//!
//! Structured logging via `tracing` and `tracing-subscriber`. The configured
//! level seeds an `EnvFilter`, so `RUST_LOG` can still override per-module
//! verbosity at the console.

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::error::{BenchError, BenchResult};

/// Parse a configured level string into a tracing [`Level`].
pub fn parse_level(level: &str) -> BenchResult<Level> {
    level
        .parse::<Level>()
        .map_err(|_| BenchError::Config(format!("Invalid log level '{}'", level)))
}

/// Initialize the global tracing subscriber from a configured level.
///
/// Returns an error for an unknown level string or if a subscriber is
/// already installed; tests that need logging should use their own
/// dispatcher instead.
pub fn init(level: &str) -> BenchResult<()> {
    let level = parse_level(level)?;
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| BenchError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}
