//! `tokio_util` codec over the frame scanner.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::FrameError;
use crate::scanner::{scan_frame, ScanConfig};

/// Yields raw SYN..ETB frames from an async byte stream and writes raw bytes
/// (acknowledgements) back verbatim.
#[derive(Debug, Clone, Default)]
pub struct RtdCodec {
    config: ScanConfig,
}

impl RtdCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }
}

impl Decoder for RtdCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
        Ok(scan_frame(src, self.config.max_frame_len))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if !src.is_empty() {
            tracing::debug!(
                pending = src.len(),
                "discarding partial frame at end of stream"
            );
            src.clear();
        }
        Ok(None)
    }
}

impl Encoder<Bytes> for RtdCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), FrameError> {
        dst.reserve(item.len());
        dst.put_slice(&item);
        Ok(())
    }
}
