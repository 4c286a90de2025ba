//! Shared scoreboard state and per-connection RTD handling.
//!
//! One [`Scoreboard`] exists per process. Every connection, TCP or serial,
//! reassembles its own frames and patches that same buffer:
//!
//! ```text
//! stream ─▶ FrameReader ─▶ FrameHandler ─▶ Scoreboard ─▶ fields_touched ─▶ BoardEvent
//!                               │
//!                               └─▶ ACK back on the same stream
//! ```

#[cfg(feature = "async")]
pub mod async_server;
pub mod connection;
pub mod error;
pub mod handler;
pub mod listener;
pub mod projector;
pub mod scoreboard;

#[cfg(feature = "async")]
pub use async_server::{run_async_connection, serve_async};
pub use connection::{BoardEvent, Connection};
pub use error::{BoardError, Result};
pub use handler::{BoardConfig, FrameHandler, FrameOutcome, PatchReport};
pub use listener::BoardListener;
pub use projector::{fields_touched, FieldValue};
pub use scoreboard::Scoreboard;
