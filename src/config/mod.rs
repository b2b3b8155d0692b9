//! Configuration module for serial_link.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `SERIAL_LINK_CONFIG` environment variable (explicit path)
//! 2. `./serial-link.toml` (current directory)
//! 3. `~/.config/serial-link/serial-link.toml` (XDG on Linux/macOS)
//! 4. `%APPDATA%\serial-link\serial-link.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Any configuration value can be overridden via environment variables.
//! The pattern is: `SERIAL_LINK_<SECTION>_<KEY>`
//!
//! Examples:
//! - `SERIAL_LINK_SERIAL_DEVICE=/dev/ttyACM0`
//! - `SERIAL_LINK_LINK_WRITE_INTERVAL_MS=50`
//! - `SERIAL_LINK_LOGGING_LEVEL=serial_link=debug`
//!
//! # Example
//!
//! ```rust,no_run
//! use serial_link::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//!
//! println!("Device: {}", config.serial.device);
//! println!("Write interval: {}ms", config.link.write_interval_ms);
//! # Ok::<(), serial_link::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LinkConfig, LogFormat, LoggingConfig, SerialConfig};
