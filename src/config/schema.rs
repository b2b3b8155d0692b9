//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use crate::connection::LinkOptions;
use crate::port::{DataBits, FlowControl, Parity, PortConfiguration, StopBits};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial device configuration
    pub serial: SerialConfig,
    /// Framing and reconnection configuration
    pub link: LinkConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values the link cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::validation(
                "serial.baud_rate",
                "must be greater than zero",
            ));
        }
        if self.link.read_delimiter.is_empty() {
            return Err(ConfigError::validation(
                "link.read_delimiter",
                "must not be empty",
            ));
        }
        if self.link.reconnect_interval_ms == 0 {
            return Err(ConfigError::validation(
                "link.reconnect_interval_ms",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Serial device configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path, e.g. "/dev/ttyUSB0" or "COM3"
    pub device: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Read timeout in milliseconds
    pub read_timeout_ms: u64,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: default_device().to_string(),
            baud_rate: 115200,
            read_timeout_ms: 1000,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }
}

fn default_device() -> &'static str {
    if cfg!(windows) {
        "COM1"
    } else {
        "/dev/ttyUSB0"
    }
}

impl SerialConfig {
    /// Get the read timeout as Duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Build the parameters used to (re)open the device.
    pub fn port_configuration(&self) -> PortConfiguration {
        PortConfiguration {
            baud_rate: self.baud_rate,
            data_bits: self.data_bits,
            flow_control: self.flow_control,
            parity: self.parity,
            stop_bits: self.stop_bits,
            read_timeout: self.read_timeout(),
        }
    }
}

/// Framing and reconnection section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Minimum spacing between writes in milliseconds
    pub write_interval_ms: u64,
    /// Inbound line terminator
    pub read_delimiter: String,
    /// Appended to every outbound line
    pub write_delimiter: String,
    /// Delay between failed reopen attempts in milliseconds
    pub reconnect_interval_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            write_interval_ms: 0,
            read_delimiter: "\n".to_string(),
            write_delimiter: "\n".to_string(),
            reconnect_interval_ms: 100,
        }
    }
}

impl LinkConfig {
    pub fn link_options(&self) -> LinkOptions {
        LinkOptions {
            write_interval: Duration::from_millis(self.write_interval_ms),
            read_delimiter: self.read_delimiter.clone(),
            write_delimiter: self.write_delimiter.clone(),
            reconnect_interval: Duration::from_millis(self.reconnect_interval_ms),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive: "trace", "debug", "info", "serial_link=debug", ...
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.link.read_delimiter, "\n");
        assert_eq!(config.link.reconnect_interval_ms, 100);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[serial]"));
        assert!(toml_str.contains("[link]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [serial]
            device = "/dev/ttyACM0"
            baud_rate = 9600
            parity = "even"

            [link]
            read_delimiter = "\r\n"
            write_interval_ms = 50
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.serial.device, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.parity, Parity::Even);
        assert_eq!(config.link.read_delimiter, "\r\n");
        // Defaults should still work
        assert_eq!(config.link.write_delimiter, "\n");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_runtime_conversions() {
        let mut config = Config::default();
        config.serial.read_timeout_ms = 250;
        config.link.write_interval_ms = 20;

        let port = config.serial.port_configuration();
        assert_eq!(port.baud_rate, 115200);
        assert_eq!(port.read_timeout, Duration::from_millis(250));

        let options = config.link.link_options();
        assert_eq!(options.write_interval, Duration::from_millis(20));
        assert_eq!(options.reconnect_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.link.read_delimiter.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { ref key, .. }) if key == "link.read_delimiter"
        ));

        let mut config = Config::default();
        config.serial.baud_rate = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.link.reconnect_interval_ms = 0;
        assert!(config.validate().is_err());
    }
}
