//! Logging initialization

use fastsync_config::{LogFormat, LoggingConfig};
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging setup errors
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The configured filter directive does not parse
    #[error("Invalid log filter '{directive}': {reason}")]
    InvalidFilter {
        /// Directive as configured
        directive: String,
        /// Parser error
        reason: String,
    },

    /// A global subscriber is already installed
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Builds the event filter. `RUST_LOG` wins over the configured level.
fn filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| LoggingError::InvalidFilter {
        directive: config.level.clone(),
        reason: e.to_string(),
    })
}

/// Installs the global tracing subscriber.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = filter(config)?;

    let installed = match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .try_init(),
    };
    installed.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(target: "fastsync::logging", level = %config.level, format = %config.format, "logging initialized");
    Ok(())
}
