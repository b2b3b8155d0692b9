//! Mock transport implementation for testing.
//!
//! Provides a [`MockTransport`] that simulates a flaky link without requiring
//! hardware. Reads block until the test feeds bytes, writes are logged with
//! their timestamps, and failures can be injected on demand.

use super::error::PortError;
use super::traits::Transport;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Inner state of the mock transport.
#[derive(Debug, Default)]
struct MockState {
    /// Whether a "device handle" is currently held.
    open: bool,
    /// Bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Every buffer passed to `write`, in order.
    write_log: Vec<Vec<u8>>,
    /// When each logged write happened.
    write_times: Vec<Instant>,
    /// Injected I/O failure for reads and writes.
    fault: Option<String>,
    /// Number of upcoming `reopen` calls that should fail.
    reopen_failures: usize,
    reopen_calls: usize,
    close_calls: usize,
    flush_calls: usize,
}

/// Mock transport for testing.
///
/// Clones share state, so a test keeps one clone to drive the link while the
/// connection owns the other.
///
/// # Example
/// ```
/// use serial_link::port::{MockTransport, Transport};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let port = MockTransport::new("MOCK0");
/// port.reopen().await.unwrap();
///
/// port.enqueue_read(b"OK");
/// let mut buffer = [0u8; 2];
/// let n = port.read(&mut buffer).await.unwrap();
/// assert_eq!(&buffer[..n], b"OK");
///
/// port.write(b"AT\n").await.unwrap();
/// assert_eq!(port.write_log(), vec![b"AT\n".to_vec()]);
/// # }
/// ```
#[derive(Clone)]
pub struct MockTransport {
    /// The port name/identifier.
    name: String,
    state: Arc<Mutex<MockState>>,
    /// Wakes a read blocked on an empty queue.
    data_ready: Arc<Notify>,
    /// Wakes tests waiting for writes or reopen attempts.
    activity: Arc<Notify>,
}

impl MockTransport {
    /// Create a new, closed mock transport with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockState::default())),
            data_ready: Arc::new(Notify::new()),
            activity: Arc::new(Notify::new()),
        }
    }

    /// Make bytes available to subsequent reads.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
        self.data_ready.notify_one();
    }

    /// Make every read and write fail until the next successful reopen.
    pub fn set_fault(&self, message: impl Into<String>) {
        self.state.lock().fault = Some(message.into());
        self.data_ready.notify_one();
    }

    /// Remove an injected fault without reopening.
    pub fn clear_fault(&self) {
        self.state.lock().fault = None;
    }

    /// Make the next `count` reopen attempts fail with a device error.
    pub fn fail_next_reopens(&self, count: usize) {
        self.state.lock().reopen_failures = count;
    }

    /// Get a copy of all buffers written to the transport.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Get the instants at which each logged write happened.
    pub fn write_times(&self) -> Vec<Instant> {
        self.state.lock().write_times.clone()
    }

    /// Number of bytes still queued for reading.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    pub fn reopen_calls(&self) -> usize {
        self.state.lock().reopen_calls
    }

    pub fn close_calls(&self) -> usize {
        self.state.lock().close_calls
    }

    pub fn flush_calls(&self) -> usize {
        self.state.lock().flush_calls
    }

    /// Wait until at least `count` writes have been logged, then return the log.
    pub async fn wait_for_writes(&self, count: usize) -> Vec<Vec<u8>> {
        loop {
            let notified = self.activity.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let state = self.state.lock();
                if state.write_log.len() >= count {
                    return state.write_log.clone();
                }
            }
            notified.await;
        }
    }

    /// Wait until `reopen` has been called at least `count` times.
    pub async fn wait_for_reopen_calls(&self, count: usize) {
        loop {
            let notified = self.activity.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.state.lock().reopen_calls >= count {
                return;
            }
            notified.await;
        }
    }

    fn io_fault(message: &str) -> PortError {
        PortError::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            message.to_string(),
        ))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn close(&self) -> Result<(), PortError> {
        let result = {
            let mut state = self.state.lock();
            state.close_calls += 1;
            if state.open {
                state.open = false;
                Ok(())
            } else {
                Err(PortError::NotConnected)
            }
        };
        self.data_ready.notify_one();
        self.activity.notify_waiters();
        result
    }

    async fn reopen(&self) -> Result<(), PortError> {
        let result = {
            let mut state = self.state.lock();
            state.reopen_calls += 1;
            state.open = false;
            if state.reopen_failures > 0 {
                state.reopen_failures -= 1;
                Err(PortError::device("scripted reopen failure"))
            } else {
                state.open = true;
                state.fault = None;
                Ok(())
            }
        };
        self.data_ready.notify_one();
        self.activity.notify_waiters();
        result
    }

    async fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        loop {
            {
                let mut state = self.state.lock();
                if !state.open {
                    return Err(PortError::NotConnected);
                }
                if let Some(fault) = &state.fault {
                    return Err(Self::io_fault(fault));
                }
                if !state.read_queue.is_empty() {
                    let mut bytes_read = 0;
                    for slot in buffer.iter_mut() {
                        match state.read_queue.pop_front() {
                            Some(byte) => {
                                *slot = byte;
                                bytes_read += 1;
                            }
                            None => break,
                        }
                    }
                    return Ok(bytes_read);
                }
            }
            self.data_ready.notified().await;
        }
    }

    async fn write(&self, buffer: &[u8]) -> Result<usize, PortError> {
        let result = {
            let mut state = self.state.lock();
            if !state.open {
                Err(PortError::NotConnected)
            } else if let Some(fault) = &state.fault {
                Err(Self::io_fault(fault))
            } else {
                state.write_log.push(buffer.to_vec());
                state.write_times.push(Instant::now());
                Ok(buffer.len())
            }
        };
        self.activity.notify_waiters();
        result
    }

    async fn flush(&self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        state.flush_calls += 1;
        if state.open {
            Ok(())
        } else {
            Err(PortError::NotConnected)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}
