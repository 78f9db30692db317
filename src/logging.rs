//! Tracing subscriber setup for binaries embedding the library.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;
use crate::error::LookoutError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human readable.
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Filter from `RUST_LOG` when set and valid, else the configured level.
fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install a global subscriber.
///
/// # Errors
///
/// [`LookoutError::Logging`] if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), LookoutError> {
    let registry = tracing_subscriber::registry().with(env_filter(config));
    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };
    installed.map_err(|e| LookoutError::Logging(e.to_string()))?;

    tracing::info!(
        event = "Logging",
        level = %config.level,
        format = ?config.format,
        "tracing initialized"
    );
    Ok(())
}
