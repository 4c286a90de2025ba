use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use rtdlink_transport::RtdStream;

use crate::codec::{encode_frame, ACK_FRAME};
use crate::error::{FrameError, Result};
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Writes RTD bytes to any `Write` stream.
///
/// The receiving side only ever writes [`ACK_FRAME`]; the encoding path
/// exists for controller simulators and tests.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Write the fixed acknowledgement frame (blocking).
    pub fn send_ack(&mut self) -> Result<()> {
        self.write_raw(&ACK_FRAME)
    }

    /// Encode and send `text` for `offset`.
    pub fn send_frame(&mut self, offset: usize, text: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(offset, text, &mut self.buf)?;
        let frame = self.buf.split().freeze();
        self.write_raw(&frame)
    }

    /// Write bytes verbatim and flush.
    ///
    /// Retries on `Interrupted` only.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                // WouldBlock on a blocking stream is an expired write timeout.
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl FrameWriter<RtdStream> {
    /// Create a frame writer for `RtdStream` with a write timeout.
    pub fn with_write_timeout(
        inner: RtdStream,
        timeout: Option<std::time::Duration>,
    ) -> Result<Self> {
        inner
            .set_write_timeout(timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::new(inner))
    }
}
