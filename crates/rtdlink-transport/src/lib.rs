//! Byte-stream transports for scoreboard RTD feeds.
//!
//! Provides a unified stream type over the two ways a scoreboard controller
//! reaches us:
//! - TCP (the controller connects to our listener)
//! - Serial line (RS-232/RS-422 adapter exposed as a tty device)
//!
//! This is the lowest layer of rtdlink. The frame scanner only ever sees
//! [`RtdStream`] as a `Read + Write` byte pipe.

pub mod error;
pub mod stream;
pub mod tcp;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, TransportError};
pub use stream::RtdStream;
pub use tcp::{TcpTransport, DEFAULT_ADDRESS, DEFAULT_PORT};

#[cfg(unix)]
pub use serial::{SerialPort, DEFAULT_BAUD};
