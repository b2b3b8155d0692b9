//! Transport abstraction layer for the physical link.
//!
//! Provides the [`Transport`] trait, a serial implementation and a scriptable
//! mock, enabling dependency injection and testing without hardware.

pub mod error;
pub mod mock;
pub mod serial;
pub mod traits;

pub use error::PortError;
pub use mock::MockTransport;
pub use serial::SerialTransport;
pub use traits::*;
