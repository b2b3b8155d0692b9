//! Shared test utilities for serial_link integration tests.
//!
//! This module provides common test infrastructure including:
//! - Opening a connection over a mock transport
//! - Bounded waits on the message stream

#![allow(dead_code)]

use serial_link::{Connection, LinkOptions, Message, MessageStream, MockTransport};
use std::time::Duration;
use tokio::sync::mpsc;

/// Upper bound for any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(2);

/// A running connection over a mock transport, plus the handles a test needs.
pub struct MockLink {
    pub port: MockTransport,
    pub connection: Connection,
    pub stream: MessageStream,
    pub input: mpsc::Sender<String>,
}

impl MockLink {
    /// Open a connection over a fresh mock transport.
    pub async fn open(options: LinkOptions) -> Self {
        let port = MockTransport::new("MOCK0");
        let (input, rx) = mpsc::channel(16);
        let (connection, stream) = Connection::open(port.clone(), rx, options)
            .await
            .expect("mock link should open");
        Self {
            port,
            connection,
            stream,
            input,
        }
    }

    /// Queue a line for writing.
    pub async fn send(&self, line: &str) {
        self.input
            .send(line.to_string())
            .await
            .expect("writer should be running");
    }

    /// Next message, failing the test if none arrives in time.
    pub async fn next(&mut self) -> Message {
        next_message(&mut self.stream).await
    }

    /// Skip error messages until a data line arrives, returning the line and
    /// how many errors were skipped.
    pub async fn next_line(&mut self) -> (String, usize) {
        let mut errors = 0;
        loop {
            match self.next().await {
                Message::Data(line) => return (line, errors),
                Message::Err(_) => errors += 1,
            }
        }
    }

    /// Drain messages until the stream stays quiet for `quiet`.
    pub async fn drain(&mut self, quiet: Duration) -> Vec<Message> {
        let mut drained = Vec::new();
        while let Ok(Some(message)) = tokio::time::timeout(quiet, self.stream.recv()).await {
            drained.push(message);
        }
        drained
    }
}

/// Receive the next message, panicking on timeout or end of stream.
pub async fn next_message(stream: &mut MessageStream) -> Message {
    tokio::time::timeout(WAIT, stream.recv())
        .await
        .expect("timed out waiting for a message")
        .expect("message stream ended")
}
