//! State shared by the connection loops, and the reconnection gate.
//!
//! The gate is a single-permit semaphore. A loop that observes an I/O failure
//! takes the permit and moves it into the [`ReconnectRequest`] it enqueues. The
//! reconnect loop drops the request (and with it the permit) once the
//! reconnection cycle for that request is over, so the permit is released by a
//! different task than the one that acquired it.

use crate::message::{Message, MessageSender};
use crate::port::{PortError, Transport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// A request to re-establish the link, holding the gate until it is processed.
#[derive(Debug)]
pub(crate) struct ReconnectRequest {
    /// When the failure behind this request was observed.
    pub(crate) observed_at: Instant,
    _permit: OwnedSemaphorePermit,
}

impl ReconnectRequest {
    pub(crate) fn new(observed_at: Instant, permit: OwnedSemaphorePermit) -> Self {
        Self {
            observed_at,
            _permit: permit,
        }
    }
}

#[derive(Clone)]
pub(crate) struct LinkContext {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) cancel: CancellationToken,
    pub(crate) closing: Arc<AtomicBool>,
    pub(crate) gate: Arc<Semaphore>,
    pub(crate) messages: MessageSender,
    pub(crate) requests: mpsc::Sender<ReconnectRequest>,
}

impl LinkContext {
    /// Deliver `message` to the application.
    ///
    /// Returns `false` when shutdown fired first. A dropped stream is not a
    /// reason to stop: the message is discarded and the link keeps running.
    pub(crate) async fn emit(&self, message: Message) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.messages.send(message) => {
                if sent.is_err() {
                    trace!(transport = self.transport.name(), "message stream dropped, discarding");
                }
                true
            }
        }
    }

    /// Report an I/O failure and ask for the link to be re-established.
    ///
    /// Blocks while another reconnection cycle holds the gate. Returns `false`
    /// when the connection is shutting down.
    pub(crate) async fn report_failure(&self, err: PortError) -> bool {
        if self.closing.load(Ordering::Acquire) {
            debug!(error = %err, "failure during shutdown, not reconnecting");
            self.cancel.cancelled().await;
            return false;
        }

        let observed_at = Instant::now();
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            permit = Arc::clone(&self.gate).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return false,
            },
        };

        if !self.emit(Message::Err(err)).await {
            return false;
        }

        let request = ReconnectRequest::new(observed_at, permit);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.requests.send(request) => sent.is_ok(),
        }
    }
}
