//! # Uptime Telemetry
//!
//! Structured logging for the uptime submission backend.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use uptime_telemetry::{init_logging, TelemetryConfig};
//!
//! init_logging(&TelemetryConfig::from_env())?;
//! tracing::info!("ready");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `uptime-backend` | Service name |
//! | `UPTIME_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `UPTIME_JSON_LOGS` | `false` (`true` in containers) | JSON output |

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod config;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};

use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter {filter:?}: {reason}")]
    Filter { filter: String, reason: String },

    #[error("Failed to install global subscriber: {0}")]
    Install(String),
}

/// Build the filter for `config`.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level).map_err(|e| TelemetryError::Filter {
        filter: config.log_level.clone(),
        reason: e.to_string(),
    })
}

/// Install the global `tracing` subscriber.
///
/// Fails if the filter does not parse or a subscriber is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;

    let result = if config.json_logs {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .try_init()
    } else {
        fmt().with_env_filter(filter).with_target(false).try_init()
    };
    result.map_err(|e| TelemetryError::Install(e.to_string()))?;

    tracing::debug!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}
