//! Tracing subscriber setup for hosts that do not install their own.

use grudge_core::config::GeneralConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

/// Why the subscriber could not be installed.
#[derive(Error, Debug)]
pub enum LoggingError {
    /// `general.log_level` is not a valid filter expression.
    #[error("Invalid log filter '{filter}': {source}")]
    Filter {
        /// The rejected expression.
        filter: String,
        /// Parser detail.
        #[source]
        source: ParseError,
    },

    /// A global subscriber is already set.
    #[error("Tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` wins over `general.log_level` when set. With
/// `general.json_logs` the output is one JSON object per line.
///
/// # Errors
/// Returns [`LoggingError::Filter`] if the configured filter does not parse
/// and [`LoggingError::AlreadyInstalled`] if a global subscriber exists.
pub fn init(general: &GeneralConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&general.log_level).map_err(|source| LoggingError::Filter {
            filter: general.log_level.clone(),
            source,
        })?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if general.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))
}
