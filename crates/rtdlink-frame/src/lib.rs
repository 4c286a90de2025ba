//! RTD frame scanning and decoding for scoreboard feeds.
//!
//! An RTD frame is delimited by SYN (`0x16`) and ETB (`0x17`):
//!
//! ```text
//! <SYN> HEADER(8) <SOH> CONTROL(10) <STX> TEXT <EOT> SUM(2) <ETB>
//! ```
//!
//! - [`scanner`] finds frame boundaries in an arbitrarily fragmented stream
//! - [`codec`] validates a complete frame and extracts its offset and text
//! - [`reader`] / [`writer`] drive a blocking `Read`/`Write` stream
//! - `tokio_codec` (behind `async`) exposes the scanner as a tokio codec

pub mod codec;
pub mod error;
pub mod markers;
pub mod reader;
pub mod scanner;
#[cfg(feature = "async")]
pub mod tokio_codec;
pub mod writer;

pub use codec::{
    checksum, decode_frame, encode_frame, ChecksumStatus, RtdFrame, ACK_FRAME, DEVICE_HEADER,
    MAX_OFFSET, MIN_FRAME_LEN,
};
pub use error::{FrameError, Result};
pub use markers::{EOT, ETB, SOH, STX, SYN};
pub use reader::FrameReader;
pub use scanner::{scan_frame, FrameScanner, ScanConfig, DEFAULT_MAX_FRAME_LEN};
#[cfg(feature = "async")]
pub use tokio_codec::RtdCodec;
pub use writer::FrameWriter;
