//! Logging setup for `sysexec` using `tracing` + `tracing-subscriber`.
//!
//! - `RUST_LOG` selects levels (default `systemcalls=warn`)
//! - `SYSTEMCALLS_LOG_FORMAT=json` switches to JSON lines, anything else is pretty
//!
//! Logs go to stderr; stdout belongs to the child processes.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "systemcalls=warn";
const ENV_LOG_FORMAT: &str = "SYSTEMCALLS_LOG_FORMAT";

/// Initialise the global subscriber. Call once at startup.
pub fn init_logging() -> Result<()> {
    let log_format = std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    }
    .context("Failed to install tracing subscriber")
}
