//! Unified logging initialization for all Charon binaries.
//!
//! Filter resolution order, highest priority first:
//! 1. CLI flags (`-v`/`-q`)
//! 2. `RUST_LOG` environment variable
//! 3. Binary-specific default filter

use anyhow::Result;
use clap_verbosity_flag::{LogLevel, Verbosity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// `verbosity` carries the parsed `-v`/`-q` flags; `default_filter` is
/// the filter string used when neither the flags nor `RUST_LOG` are
/// set (e.g. `"charon_billing=info"`).
pub fn init_logging<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<()> {
    let filter = if let Some(log_level) = verbosity.log_level() {
        // CLI flags take priority
        EnvFilter::try_new(format!("{}", log_level))?
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .compact(),
        )
        .init();

    Ok(())
}
