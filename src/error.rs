//! Connection-level error type.
//!
//! Failures inside the running loops never surface here; they travel on the
//! message stream. Only opening and closing a [`Connection`](crate::Connection)
//! return errors directly.

use crate::config::ConfigError;
use crate::port::PortError;
use thiserror::Error;

/// Errors returned by [`Connection::open`](crate::Connection::open) and
/// [`Connection::close`](crate::Connection::close).
#[derive(Debug, Error)]
pub enum LinkError {
    /// The initial open of the transport failed; no loop was started.
    #[error("failed to open link: {0}")]
    Open(#[source] PortError),

    /// The transport reported an error while being closed.
    #[error("failed to close link: {0}")]
    Close(#[source] PortError),

    /// The read delimiter must contain at least one byte.
    #[error("read delimiter must not be empty")]
    EmptyDelimiter,

    /// A connection loop panicked.
    #[error("connection task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The configuration could not be turned into link options.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Convenient Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;
