// Logging module for structured logging using the tracing crate

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info";

/// Output format of log events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line, for log aggregation systems
    #[default]
    Json,
    /// Multi-line human readable output
    Pretty,
}

/// Initialize the tracing subscriber for structured logging
///
/// The level filter comes from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
/// Events go to stdout in the requested format.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
///
/// # Examples
///
/// ```
/// use thumbmark::logging::{init_subscriber, LogFormat};
///
/// init_subscriber(LogFormat::Json).expect("Failed to initialize logging");
///
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber(format: LogFormat) -> Result<(), String> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = Registry::default().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    }
    .map_err(|e| format!("Failed to initialize logging: {}", e))
}
