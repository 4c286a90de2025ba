use std::io::{ErrorKind, Read};

use bytes::Bytes;
use rtdlink_transport::RtdStream;

use crate::error::{FrameError, Result};
use crate::scanner::{FrameScanner, ScanConfig};

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads complete raw frames from any `Read` stream.
///
/// Handles partial reads and stray bytes internally; callers always get a
/// complete SYN..ETB byte range, ready for [`crate::decode_frame`].
pub struct FrameReader<T> {
    inner: T,
    scanner: FrameScanner,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, ScanConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: ScanConfig) -> Self {
        Self {
            inner,
            scanner: FrameScanner::with_config(config),
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached. A
    /// partial frame pending at EOF is discarded.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(frame) = self.scanner.next_frame() {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if self.scanner.pending() > 0 {
                    tracing::debug!(
                        pending = self.scanner.pending(),
                        "discarding partial frame at end of stream"
                    );
                }
                return Err(FrameError::ConnectionClosed);
            }

            self.scanner.push(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current scanner configuration.
    pub fn config(&self) -> &ScanConfig {
        self.scanner.config()
    }
}

impl FrameReader<RtdStream> {
    /// Create a frame reader for `RtdStream` and apply the read timeout from config.
    pub fn with_config_stream(inner: RtdStream, config: ScanConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: rtdlink_transport::TransportError) -> FrameError {
    match err {
        rtdlink_transport::TransportError::Io(io)
        | rtdlink_transport::TransportError::Accept(io) => FrameError::Io(io),
        rtdlink_transport::TransportError::Bind { source, .. }
        | rtdlink_transport::TransportError::Connect { source, .. }
        | rtdlink_transport::TransportError::Serial { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
