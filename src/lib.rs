//! Serial Link Library
//!
//! A resilient line-oriented link over an unreliable serial device. The
//! application feeds strings in and receives lines and link errors out; the
//! device is re-opened automatically whenever a read or write fails.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `connection`: Reader, writer and reconnect loops behind [`Connection`]
//! - `error`: Link-level error handling
//! - `framing`: Delimiter-based line framing
//! - `logging`: Tracing subscriber setup
//! - `message`: Unbuffered message stream handed to the application
//! - `port`: Transport abstraction and the serial/mock implementations

pub mod config;
pub mod connection;
pub mod error;
pub mod framing;
pub mod logging;
pub mod message;
pub mod port;

pub use connection::{Connection, LinkOptions, RECONNECT_INTERVAL};
pub use error::{LinkError, LinkResult};
pub use framing::{frame_outbound, LineFramer, MAX_LINE_LEN};
pub use message::{Message, MessageStream, StreamClosed};
pub use port::{
    DataBits, FlowControl, MockTransport, Parity, PortConfiguration, PortError, SerialTransport,
    StopBits, Transport,
};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
