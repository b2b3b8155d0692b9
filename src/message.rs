//! Messages delivered to the application and the rendezvous stream carrying them.
//!
//! Delivery is unbuffered: [`MessageSender::send`] completes only once the
//! consumer has taken the message out of [`MessageStream::recv`]. A slow
//! consumer therefore stalls the link loops, which is the backpressure contract
//! of the connection.

use crate::port::PortError;
use tokio::sync::{mpsc, oneshot};

/// One event on the inbound message stream.
#[derive(Debug)]
pub enum Message {
    /// A complete inbound line, without its delimiter.
    Data(String),
    /// A link failure or a failed reconnection attempt.
    Err(PortError),
}

impl Message {
    pub fn data(&self) -> Option<&str> {
        match self {
            Self::Data(line) => Some(line),
            Self::Err(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PortError> {
        match self {
            Self::Data(_) => None,
            Self::Err(err) => Some(err),
        }
    }

    pub fn is_err(&self) -> bool {
        matches!(self, Self::Err(_))
    }
}

/// The receiving side went away before taking the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("message stream closed")]
pub struct StreamClosed;

struct Envelope {
    message: Message,
    delivered: oneshot::Sender<()>,
}

/// Producer half, cloned into each connection loop.
#[derive(Clone)]
pub(crate) struct MessageSender {
    tx: mpsc::Sender<Envelope>,
}

/// Receive-only stream of [`Message`] values.
///
/// Yields `None` once every connection loop has stopped.
pub struct MessageStream {
    rx: mpsc::Receiver<Envelope>,
}

pub(crate) fn channel() -> (MessageSender, MessageStream) {
    let (tx, rx) = mpsc::channel(1);
    (MessageSender { tx }, MessageStream { rx })
}

impl MessageSender {
    /// Hand `message` to the consumer and wait until it has been received.
    ///
    /// Dropping this future before it completes withdraws the message: the
    /// stream discards envelopes whose sender stopped waiting.
    pub(crate) async fn send(&self, message: Message) -> Result<(), StreamClosed> {
        let (delivered, ack) = oneshot::channel();
        self.tx
            .send(Envelope { message, delivered })
            .await
            .map_err(|_| StreamClosed)?;
        ack.await.map_err(|_| StreamClosed)
    }
}

impl MessageStream {
    /// Receive the next message.
    pub async fn recv(&mut self) -> Option<Message> {
        while let Some(envelope) = self.rx.recv().await {
            if envelope.delivered.send(()).is_ok() {
                return Some(envelope.message);
            }
        }
        None
    }
}

impl std::fmt::Debug for MessageStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStream").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_send_waits_for_receiver() {
        let (tx, mut rx) = channel();

        let send = tokio::spawn(async move { tx.send(Message::Data("one".into())).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!send.is_finished(), "send must block until received");

        let message = rx.recv().await.unwrap();
        assert_eq!(message.data(), Some("one"));
        assert_eq!(send.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_withdrawn_message_is_not_delivered() {
        let (tx, mut rx) = channel();

        let withdrawn = tokio::time::timeout(
            Duration::from_millis(20),
            tx.send(Message::Data("stale".into())),
        )
        .await;
        assert!(withdrawn.is_err());

        let delivered = tokio::spawn(async move { tx.send(Message::Data("fresh".into())).await });
        assert_eq!(rx.recv().await.unwrap().data(), Some("fresh"));
        assert_eq!(delivered.await.unwrap(), Ok(()));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_stream_fails_send() {
        let (tx, rx) = channel();
        drop(rx);
        assert_eq!(tx.send(Message::Data("x".into())).await, Err(StreamClosed));
    }

    #[test]
    fn test_accessors() {
        let data = Message::Data("line".into());
        assert_eq!(data.data(), Some("line"));
        assert!(data.error().is_none());
        assert!(!data.is_err());

        let err = Message::Err(PortError::NotConnected);
        assert!(err.is_err());
        assert!(err.data().is_none());
        assert!(err.error().unwrap().is_not_connected());
    }
}
