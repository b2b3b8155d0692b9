//! Core traits for link abstraction.
//!
//! Defines the [`Transport`] trait that allows both real serial ports and mock
//! implementations to sit underneath a [`Connection`](crate::connection::Connection).

use super::error::PortError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration parameters for a serial port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// How long a single read may block before reporting "no data".
    pub read_timeout: Duration,
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            read_timeout: Duration::from_secs(1),
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// The physical link underneath a connection.
///
/// All methods take `&self`: the reader and writer loops call `read` and
/// `write` concurrently, so implementations synchronize internally and must not
/// serialize a blocked read against a write.
///
/// `read` and `write` may fail at any time with a transient error. `reopen`
/// drops any existing handle and opens a fresh one; it may be called again
/// after it fails.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Release the underlying handle.
    ///
    /// Returns [`PortError::NotConnected`] if there is no handle to close.
    async fn close(&self) -> Result<(), PortError>;

    /// Close any existing handle, then open the device again.
    async fn reopen(&self) -> Result<(), PortError>;

    /// Read bytes into `buffer`.
    ///
    /// `Ok(0)` means no data arrived within the transport's own read timeout;
    /// it is not an error.
    async fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Write bytes from `buffer`, returning how many were accepted.
    async fn write(&self, buffer: &[u8]) -> Result<usize, PortError>;

    /// Discard anything buffered in the device.
    async fn flush(&self) -> Result<(), PortError> {
        Ok(())
    }

    /// Get the name/path of this link.
    fn name(&self) -> &str;
}
