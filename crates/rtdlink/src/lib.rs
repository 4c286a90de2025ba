//! Receiver for RTD scoreboard controller feeds.
//!
//! A controller streams small frames, each overwriting a slice of a fixed-size
//! scoreboard buffer. rtdlink reassembles those frames from TCP or serial
//! streams, applies them to one shared buffer, reports which named fields
//! changed and acknowledges each frame.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP listener/connector and raw-mode serial ports
//! - [`frame`]: frame scanning, decoding, encoding and the ACK
//! - [`template`]: ITF template loading and field lookup
//! - [`board`]: shared scoreboard, field projection and connection handling

/// Re-export transport types.
pub mod transport {
    pub use rtdlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use rtdlink_frame::*;
}

/// Re-export template types.
pub mod template {
    pub use rtdlink_template::*;
}

/// Re-export scoreboard types.
pub mod board {
    pub use rtdlink_board::*;
}
