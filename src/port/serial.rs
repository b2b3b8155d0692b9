//! Serial port transport.
//!
//! Wraps the `serialport` crate behind the [`Transport`] trait. The device is
//! held as two handles (the opened port and a `try_clone` of it) so a read
//! blocked waiting for data never holds up a write. Blocking calls run on
//! tokio's blocking pool.

use super::error::PortError;
use super::traits::{PortConfiguration, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::io::{Read, Write};
use std::sync::Arc;

type Slot = Arc<Mutex<Option<Box<dyn serialport::SerialPort>>>>;

/// Serial device transport, re-openable by path.
pub struct SerialTransport {
    /// The port name/path for identification and re-opening.
    name: String,
    /// Parameters used on every (re)open.
    config: PortConfiguration,
    /// Handle used by `read`.
    reader: Slot,
    /// Handle used by `write` and `flush`.
    writer: Slot,
}

impl SerialTransport {
    /// Create a transport for `port_name` without opening the device.
    ///
    /// The connection manager opens it through [`Transport::reopen`].
    pub fn new(port_name: impl Into<String>, config: PortConfiguration) -> Self {
        Self {
            name: port_name.into(),
            config,
            reader: Arc::new(Mutex::new(None)),
            writer: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a transport and open the device right away.
    ///
    /// # Example
    /// ```no_run
    /// use serial_link::port::{PortConfiguration, SerialTransport};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut config = PortConfiguration::default();
    /// config.baud_rate = 115200;
    /// let port = SerialTransport::open("/dev/ttyUSB0", config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open(
        port_name: impl Into<String>,
        config: PortConfiguration,
    ) -> Result<Self, PortError> {
        let transport = Self::new(port_name, config);
        transport.reopen().await?;
        Ok(transport)
    }

    /// Get the port configuration.
    pub fn config(&self) -> &PortConfiguration {
        &self.config
    }

    /// Whether a device handle is currently held.
    pub fn is_open(&self) -> bool {
        self.writer.lock().is_some()
    }
}

fn open_device(
    port_name: &str,
    config: &PortConfiguration,
) -> Result<Box<dyn serialport::SerialPort>, PortError> {
    serialport::new(port_name, config.baud_rate)
        .data_bits(config.data_bits.into())
        .flow_control(config.flow_control.into())
        .parity(config.parity.into())
        .stop_bits(config.stop_bits.into())
        .timeout(config.read_timeout)
        .open()
        .map_err(|e| match e.kind() {
            serialport::ErrorKind::NoDevice => PortError::not_found(port_name),
            serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
            _ => PortError::device(e),
        })
}

async fn run_blocking<T, F>(f: F) -> Result<T, PortError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PortError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PortError::Io(std::io::Error::other(e)))?
}

#[async_trait]
impl Transport for SerialTransport {
    async fn close(&self) -> Result<(), PortError> {
        let reader = Arc::clone(&self.reader);
        let writer = Arc::clone(&self.writer);

        run_blocking(move || {
            let mut reader = reader.lock();
            let mut writer = writer.lock();
            let had_reader = reader.take().is_some();
            let had_writer = writer.take().is_some();
            if had_reader || had_writer {
                Ok(())
            } else {
                Err(PortError::NotConnected)
            }
        })
        .await
    }

    async fn reopen(&self) -> Result<(), PortError> {
        let name = self.name.clone();
        let config = self.config.clone();
        let reader = Arc::clone(&self.reader);
        let writer = Arc::clone(&self.writer);

        run_blocking(move || {
            let mut reader = reader.lock();
            let mut writer = writer.lock();
            reader.take();
            writer.take();

            let port = open_device(&name, &config)?;
            let write_half = port.try_clone().map_err(PortError::device)?;
            *reader = Some(port);
            *writer = Some(write_half);
            Ok(())
        })
        .await
    }

    async fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let buffer_len = buffer.len();
        let reader = Arc::clone(&self.reader);

        let (temp_buffer, bytes_read) = run_blocking(move || {
            let mut slot = reader.lock();
            let port = slot.as_mut().ok_or(PortError::NotConnected)?;
            let mut temp_buffer = vec![0u8; buffer_len];
            match port.read(&mut temp_buffer) {
                Ok(n) => Ok((temp_buffer, n)),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok((temp_buffer, 0)),
                Err(e) => Err(PortError::Io(e)),
            }
        })
        .await?;

        buffer[..bytes_read].copy_from_slice(&temp_buffer[..bytes_read]);
        Ok(bytes_read)
    }

    async fn write(&self, buffer: &[u8]) -> Result<usize, PortError> {
        let data = buffer.to_vec();
        let writer = Arc::clone(&self.writer);

        run_blocking(move || {
            let mut slot = writer.lock();
            let port = slot.as_mut().ok_or(PortError::NotConnected)?;
            port.write(&data).map_err(PortError::Io)
        })
        .await
    }

    async fn flush(&self) -> Result<(), PortError> {
        let writer = Arc::clone(&self.writer);

        run_blocking(move || {
            let slot = writer.lock();
            let port = slot.as_ref().ok_or(PortError::NotConnected)?;
            port.clear(serialport::ClearBuffer::All)
                .map_err(PortError::Serial)
        })
        .await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.name)
            .field("baud_rate", &self.config.baud_rate)
            .field("open", &self.is_open())
            .finish()
    }
}
