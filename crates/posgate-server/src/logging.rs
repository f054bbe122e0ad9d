//! Logging setup.

use crate::config::ConfigError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber. `RUST_LOG` wins over `default_level`.
pub fn setup_logging(default_level: &str) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| ConfigError::Invalid(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .map_err(|e| ConfigError::Invalid(format!("Logging already initialized: {}", e)))?;

    Ok(())
}
