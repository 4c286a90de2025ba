use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, warn};

use crate::markers::{ETB, SYN};

/// Default upper bound on a single frame, SYN through ETB: 64 KiB.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Configuration for frame scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// A pending frame longer than this is dropped. Default: 64 KiB.
    pub max_frame_len: usize,
    /// Read timeout for blocking streams. Default: none, a controller may
    /// idle mid-frame indefinitely.
    pub read_timeout: Option<std::time::Duration>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            read_timeout: None,
        }
    }
}

/// Extract the next complete SYN..ETB frame from `src`.
///
/// Returns `None` when `src` holds no complete frame yet. Consumes the
/// emitted frame and any bytes that can never belong to a frame:
/// - anything before the SYN that starts the emitted frame
/// - an ETB with no SYN before it, and everything up to it
/// - while waiting for ETB, everything before the most recent SYN
///
/// When several SYNs precede an ETB, the most recent one starts the frame.
pub fn scan_frame(src: &mut BytesMut, max_frame_len: usize) -> Option<Bytes> {
    loop {
        let Some(etb) = src.iter().position(|&b| b == ETB) else {
            discard_before_last_syn(src);
            if src.len() > max_frame_len {
                warn!(
                    pending = src.len(),
                    max = max_frame_len,
                    "dropping oversized partial frame"
                );
                src.clear();
            }
            return None;
        };

        let Some(syn) = src[..etb].iter().rposition(|&b| b == SYN) else {
            debug!(dropped = etb + 1, "dropping bytes through stray ETB");
            src.advance(etb + 1);
            continue;
        };

        if syn > 0 {
            debug!(dropped = syn, "dropping bytes before SYN");
            src.advance(syn);
        }
        let frame = src.split_to(etb - syn + 1).freeze();

        if frame.len() > max_frame_len {
            warn!(
                size = frame.len(),
                max = max_frame_len,
                "dropping oversized frame"
            );
            continue;
        }
        return Some(frame);
    }
}

fn discard_before_last_syn(src: &mut BytesMut) {
    match src.iter().rposition(|&b| b == SYN) {
        Some(0) => {}
        Some(syn) => {
            debug!(dropped = syn, "dropping bytes before SYN");
            src.advance(syn);
        }
        None if src.is_empty() => {}
        None => {
            debug!(dropped = src.len(), "dropping bytes outside any frame");
            src.clear();
        }
    }
}

/// Per-connection frame reassembly state.
///
/// Feed it chunks as they arrive with [`FrameScanner::push`] and drain
/// complete frames with [`FrameScanner::next_frame`] or
/// [`FrameScanner::frames`]. One chunk may complete zero, one or several
/// frames.
#[derive(Debug)]
pub struct FrameScanner {
    buf: BytesMut,
    config: ScanConfig,
}

impl FrameScanner {
    /// Create a scanner with default configuration.
    pub fn new() -> Self {
        Self::with_config(ScanConfig::default())
    }

    /// Create a scanner with explicit configuration.
    pub fn with_config(config: ScanConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Append received bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete frame, if one is buffered.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        scan_frame(&mut self.buf, self.config.max_frame_len)
    }

    /// Drain every complete frame currently buffered.
    pub fn frames(&mut self) -> Frames<'_> {
        Frames { scanner: self }
    }

    /// Bytes held for a frame that has not completed yet.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Current scanner configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }
}

impl Default for FrameScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the complete frames buffered in a [`FrameScanner`].
pub struct Frames<'a> {
    scanner: &'a mut FrameScanner,
}

impl Iterator for Frames<'_> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        self.scanner.next_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_frame, encode_frame};

    fn wire(offset: usize, text: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(offset, text, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn test_single_frame_in_one_chunk() {
        let bytes = wire(4, b"HOME");
        let mut scanner = FrameScanner::new();
        scanner.push(&bytes);

        let frame = scanner.next_frame().unwrap();
        assert_eq!(frame.as_ref(), bytes.as_slice());
        assert!(scanner.next_frame().is_none());
        assert_eq!(scanner.pending(), 0);
    }

    #[test]
    fn test_partial_frame_waits_for_etb() {
        let bytes = wire(0, b"HOME");
        let mut scanner = FrameScanner::new();
        scanner.push(&bytes[..bytes.len() - 1]);

        assert!(scanner.next_frame().is_none());
        assert_eq!(scanner.pending(), bytes.len() - 1);

        scanner.push(&bytes[bytes.len() - 1..]);
        assert_eq!(scanner.next_frame().unwrap().as_ref(), bytes.as_slice());
    }

    #[test]
    fn test_every_chunking_yields_the_same_frame() {
        let bytes = wire(12, b"WICKETS 3");
        for chunk_size in 1..=bytes.len() {
            let mut scanner = FrameScanner::new();
            let mut frames = Vec::new();
            for chunk in bytes.chunks(chunk_size) {
                scanner.push(chunk);
                frames.extend(scanner.frames());
            }
            assert_eq!(frames.len(), 1, "chunk size {chunk_size}");
            assert_eq!(frames[0].as_ref(), bytes.as_slice());
        }
    }

    #[test]
    fn test_split_at_every_position() {
        let bytes = wire(100, b"GUEST");
        for split in 0..=bytes.len() {
            let mut scanner = FrameScanner::new();
            scanner.push(&bytes[..split]);
            let mut frames: Vec<Bytes> = scanner.frames().collect();
            scanner.push(&bytes[split..]);
            frames.extend(scanner.frames());
            assert_eq!(frames.len(), 1, "split at {split}");
            let decoded = decode_frame(&frames[0]).unwrap();
            assert_eq!(decoded.offset, 100);
            assert_eq!(decoded.text.as_ref(), b"GUEST");
        }
    }

    #[test]
    fn test_back_to_back_frames_in_one_chunk() {
        let mut bytes = wire(0, b"A");
        bytes.extend(wire(1, b"B"));
        bytes.extend(wire(2, b"C"));

        let mut scanner = FrameScanner::new();
        scanner.push(&bytes);
        let offsets: Vec<usize> = scanner
            .frames()
            .map(|f| decode_frame(&f).unwrap().offset)
            .collect();
        assert_eq!(offsets, vec![0, 1, 2]);
    }

    #[test]
    fn test_stray_bytes_never_reach_frames() {
        let first = wire(0, b"ONE");
        let second = wire(3, b"TWO");
        let mut bytes = b"garbage".to_vec();
        bytes.extend(&first);
        bytes.extend(b"\r\nnoise");
        bytes.extend(&second);
        bytes.extend(b"trailing");

        let mut scanner = FrameScanner::new();
        scanner.push(&bytes);
        let frames: Vec<Bytes> = scanner.frames().collect();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_ref(), first.as_slice());
        assert_eq!(frames[1].as_ref(), second.as_slice());
        // Bytes outside any frame are not retained.
        assert_eq!(scanner.pending(), 0);
    }

    #[test]
    fn test_stray_etb_is_dropped() {
        let good = wire(5, b"OK");
        let mut bytes = vec![b'x', ETB, b'y'];
        bytes.extend(&good);

        let mut scanner = FrameScanner::new();
        scanner.push(&bytes);
        let frames: Vec<Bytes> = scanner.frames().collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), good.as_slice());
    }

    #[test]
    fn test_most_recent_syn_starts_the_frame() {
        let good = wire(9, b"RESENT");
        // An interrupted transmission followed by a fresh one.
        let interrupted = &wire(9, b"RES")[..10];
        let mut bytes = interrupted.to_vec();
        bytes.extend(&good);

        let mut scanner = FrameScanner::new();
        scanner.push(&bytes);
        let frame = scanner.next_frame().unwrap();
        assert_eq!(frame.as_ref(), good.as_slice());
    }

    #[test]
    fn test_interrupted_frame_across_chunks() {
        let good = wire(9, b"RESENT");
        let mut scanner = FrameScanner::new();
        scanner.push(&[SYN, b'2', b'0']);
        assert!(scanner.next_frame().is_none());
        scanner.push(&good);
        assert_eq!(scanner.next_frame().unwrap().as_ref(), good.as_slice());
    }

    #[test]
    fn test_noise_without_syn_is_not_buffered() {
        let mut scanner = FrameScanner::new();
        scanner.push(b"no frame here");
        assert!(scanner.next_frame().is_none());
        assert_eq!(scanner.pending(), 0);
    }

    #[test]
    fn test_oversized_partial_frame_is_dropped() {
        let config = ScanConfig {
            max_frame_len: 32,
            ..ScanConfig::default()
        };
        let mut scanner = FrameScanner::with_config(config);
        scanner.push(&[SYN]);
        scanner.push(&[b'A'; 40]);
        assert!(scanner.next_frame().is_none());
        assert_eq!(scanner.pending(), 0);

        // Scanning resumes with the next frame.
        let good = wire(0, b"Z");
        scanner.push(&good);
        assert_eq!(scanner.next_frame().unwrap().as_ref(), good.as_slice());
    }

    #[test]
    fn test_oversized_complete_frame_is_dropped() {
        let config = ScanConfig {
            max_frame_len: 30,
            ..ScanConfig::default()
        };
        let mut scanner = FrameScanner::with_config(config);
        let mut bytes = wire(0, b"THIS TEXT IS TOO LONG");
        let small = wire(0, b"OK");
        bytes.extend(&small);
        scanner.push(&bytes);

        let frames: Vec<Bytes> = scanner.frames().collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), small.as_slice());
    }

    #[test]
    fn test_scan_frame_on_external_buffer() {
        let bytes = wire(1, b"EXT");
        let mut buf = BytesMut::from(bytes.as_slice());
        let frame = scan_frame(&mut buf, DEFAULT_MAX_FRAME_LEN).unwrap();
        assert_eq!(frame.len(), bytes.len());
        assert!(buf.is_empty());
    }
}
