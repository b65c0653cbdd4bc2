//! Logging initialization.
//!
//! Console logging through `tracing` with an environment-driven filter
//! (`RUST_LOG`). Structured per-run session logs are the concern of the
//! surrounding system, not this core.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// Defaults to `info` when `RUST_LOG` is unset. Calling this twice reports an
/// error rather than panicking, so tests and embedding applications can race
/// on it safely.
pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))
}
