//! Port-specific error types.
//!
//! Every transport reports failures through [`PortError`]. The connection loops
//! forward these values to the application as `Message::Err`.

use thiserror::Error;

/// Errors that can occur during transport operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The device could not be opened or re-opened.
    #[error("device error: {0}")]
    Device(String),

    /// The operation needs a live handle, but the transport is closed.
    #[error("not connected")]
    NotConnected,

    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a Device error, keeping the cause in the message.
    pub fn device(cause: impl std::fmt::Display) -> Self {
        Self::Device(cause.to_string())
    }

    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True for failures to open the underlying device.
    pub fn is_device(&self) -> bool {
        matches!(self, Self::Device(_) | Self::NotFound(_))
    }

    /// True when the operation hit a closed handle.
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected)
    }
}
