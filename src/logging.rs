//! Tracing subscriber setup driven by [`LoggingConfig`].

use crate::config::{LogFormat, LoggingConfig};
use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error("failed to install subscriber: {0}")]
    Init(String),
}

/// Build the filter: `RUST_LOG` wins, then the configured level.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&config.level)?),
    }
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    result.map_err(|e| LoggingError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_filter_from_config() {
        std::env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "serial_link=debug".to_string(),
            format: LogFormat::Compact,
        };
        let filter = env_filter(&config).unwrap();
        assert_eq!(filter.to_string(), "serial_link=debug");
    }

    #[test]
    #[serial]
    fn test_invalid_filter() {
        std::env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "serial_link=loud".to_string(),
            format: LogFormat::Pretty,
        };
        assert!(matches!(env_filter(&config), Err(LoggingError::Filter(_))));
    }

    #[test]
    #[serial]
    fn test_second_init_fails() {
        std::env::remove_var("RUST_LOG");
        let config = LoggingConfig::default();
        // Another test binary may already own the global subscriber.
        let _ = init(&config);
        assert!(matches!(init(&config), Err(LoggingError::Init(_))));
    }
}
