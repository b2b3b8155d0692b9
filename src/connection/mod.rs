//! Connection manager: one transport, three loops, one reconnection at a time.
//!
//! ```text
//!                 ┌──────────── reader ────────────┐
//! Transport ◄─────┤                                ├──► MessageStream
//!                 └── writer ◄── outbound queue    │
//!                        │                         │
//!                        └── failures ──► reconnect┘
//! ```
//!
//! [`Connection::open`] re-opens the transport and starts the reader, writer
//! and reconnect tasks. Read and write failures become `Message::Err` values
//! and reconnection requests; the application never has to re-open anything.
//! [`Connection::close`] stops all three tasks and closes the transport once.

mod context;
mod reader;
mod reconnect;
mod writer;

pub use reconnect::RECONNECT_INTERVAL;

use crate::config::Config;
use crate::error::{LinkError, LinkResult};
use crate::framing::LineFramer;
use crate::message::{self, MessageStream};
use crate::port::{PortError, SerialTransport, Transport};
use context::LinkContext;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Framing and pacing parameters for a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOptions {
    /// Minimum spacing between two successive writes.
    pub write_interval: Duration,
    /// Terminates inbound lines; must not be empty.
    pub read_delimiter: String,
    /// Appended to every outbound line.
    pub write_delimiter: String,
    /// Delay between failed reopen attempts.
    pub reconnect_interval: Duration,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            write_interval: Duration::ZERO,
            read_delimiter: "\n".to_string(),
            write_delimiter: "\n".to_string(),
            reconnect_interval: RECONNECT_INTERVAL,
        }
    }
}

impl LinkOptions {
    pub fn with_write_interval(mut self, interval: Duration) -> Self {
        self.write_interval = interval;
        self
    }

    pub fn with_read_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.read_delimiter = delimiter.into();
        self
    }

    pub fn with_write_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.write_delimiter = delimiter.into();
        self
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }
}

/// Handle to a running link.
///
/// Dropping the handle cancels the loops but does not close the transport;
/// call [`close`](Self::close) for an orderly shutdown.
pub struct Connection {
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
    closing: Arc<AtomicBool>,
    gate: Arc<Semaphore>,
    /// Fired once the first `close` has finished tearing down.
    closed: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Connection {
    /// Open `transport` and start the reader, writer and reconnect loops.
    ///
    /// Strings received on `input` are written with the write delimiter
    /// appended. Inbound lines and link errors arrive on the returned stream,
    /// which must be drained: delivery is unbuffered.
    ///
    /// Fails without starting anything if the initial open fails.
    pub async fn open<T>(
        transport: T,
        input: mpsc::Receiver<String>,
        options: LinkOptions,
    ) -> LinkResult<(Self, MessageStream)>
    where
        T: Transport + 'static,
    {
        let framer = LineFramer::new(&options.read_delimiter).ok_or(LinkError::EmptyDelimiter)?;
        let transport: Arc<dyn Transport> = Arc::new(transport);
        transport.reopen().await.map_err(LinkError::Open)?;

        let (messages, stream) = message::channel();
        let (requests, requests_rx) = mpsc::channel(1);
        let ctx = LinkContext {
            transport: Arc::clone(&transport),
            cancel: CancellationToken::new(),
            closing: Arc::new(AtomicBool::new(false)),
            gate: Arc::new(Semaphore::new(1)),
            messages,
            requests,
        };

        let tasks = vec![
            tokio::spawn(reconnect::run(
                ctx.clone(),
                requests_rx,
                options.reconnect_interval,
            )),
            tokio::spawn(reader::run(ctx.clone(), framer)),
            tokio::spawn(writer::run(
                ctx.clone(),
                input,
                options.write_interval,
                options.write_delimiter,
            )),
        ];

        info!(transport = transport.name(), "link open");
        let connection = Self {
            transport,
            cancel: ctx.cancel,
            closing: ctx.closing,
            gate: ctx.gate,
            closed: CancellationToken::new(),
            tasks: Mutex::new(tasks),
        };
        Ok((connection, stream))
    }

    /// Open the serial device described by `config`.
    pub async fn open_serial(
        config: &Config,
        input: mpsc::Receiver<String>,
    ) -> LinkResult<(Self, MessageStream)> {
        config.validate()?;
        let transport = SerialTransport::new(
            config.serial.device.clone(),
            config.serial.port_configuration(),
        );
        Self::open(transport, input, config.link.link_options()).await
    }

    /// Stop all loops and close the transport.
    ///
    /// Only the first call tears the link down. Later or concurrent calls
    /// wait until that teardown has finished, then return `Ok(())`.
    pub async fn close(&self) -> LinkResult<()> {
        if self.closing.swap(true, Ordering::AcqRel) {
            debug!(transport = self.transport.name(), "close already requested");
            self.closed.cancelled().await;
            return Ok(());
        }
        self.cancel.cancel();

        // Waits out an in-flight reopen.
        let _gate = self.gate.acquire().await;

        let tasks = std::mem::take(&mut *self.tasks.lock());
        let mut task_error = None;
        for task in tasks {
            if let Err(err) = task.await {
                task_error.get_or_insert(err);
            }
        }

        let transport_closed = match self.transport.close().await {
            Ok(()) | Err(PortError::NotConnected) => Ok(()),
            Err(err) => Err(LinkError::Close(err)),
        };
        info!(transport = self.transport.name(), "link closed");
        self.closed.cancel();

        match task_error {
            Some(err) => Err(LinkError::Task(err)),
            None => transport_closed,
        }
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("transport", &self.transport)
            .field("closing", &self.is_closing())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MockTransport;

    #[test]
    fn test_default_options() {
        let options = LinkOptions::default();
        assert_eq!(options.write_interval, Duration::ZERO);
        assert_eq!(options.read_delimiter, "\n");
        assert_eq!(options.write_delimiter, "\n");
        assert_eq!(options.reconnect_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_option_builders() {
        let options = LinkOptions::default()
            .with_write_interval(Duration::from_millis(5))
            .with_read_delimiter("\r\n")
            .with_write_delimiter("\r")
            .with_reconnect_interval(Duration::from_millis(250));
        assert_eq!(options.write_interval, Duration::from_millis(5));
        assert_eq!(options.read_delimiter, "\r\n");
        assert_eq!(options.write_delimiter, "\r");
        assert_eq!(options.reconnect_interval, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_empty_read_delimiter_rejected() {
        let port = MockTransport::new("MOCK0");
        let (_tx, rx) = mpsc::channel(1);
        let result = Connection::open(
            port.clone(),
            rx,
            LinkOptions::default().with_read_delimiter(""),
        )
        .await;
        assert!(matches!(result, Err(LinkError::EmptyDelimiter)));
        assert_eq!(port.reopen_calls(), 0);
    }

    #[tokio::test]
    async fn test_close_twice_closes_transport_once() {
        let port = MockTransport::new("MOCK0");
        let (_tx, rx) = mpsc::channel(1);
        let (connection, _stream) = Connection::open(port.clone(), rx, LinkOptions::default())
            .await
            .unwrap();

        connection.close().await.unwrap();
        assert!(connection.is_closing());
        connection.close().await.unwrap();
        assert_eq!(port.close_calls(), 1);
        assert!(!port.is_open());
    }

    #[tokio::test]
    async fn test_concurrent_close_waits_for_teardown() {
        let port = MockTransport::new("MOCK0");
        let (_tx, rx) = mpsc::channel(1);
        let (connection, _stream) = Connection::open(port.clone(), rx, LinkOptions::default())
            .await
            .unwrap();

        let second = async {
            connection.close().await.unwrap();
            port.is_open()
        };
        let (first, open_after_second) = tokio::join!(connection.close(), second);

        first.unwrap();
        assert!(!open_after_second, "second close returned before teardown");
        assert_eq!(port.close_calls(), 1);
    }
}
