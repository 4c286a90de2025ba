/// Errors that can occur while scanning, decoding or encoding RTD frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame is shorter than the fixed envelope.
    #[error("malformed frame: {len} bytes is shorter than the {min}-byte envelope")]
    TooShort { len: usize, min: usize },

    /// A control byte is missing from its fixed position.
    #[error("malformed frame: expected {expected} at byte {position}, found 0x{found:02X}")]
    BadMarker {
        position: usize,
        expected: &'static str,
        found: u8,
    },

    /// The offset digits in the control block are not a decimal number.
    #[error("malformed frame: offset digits {0:?} are not decimal")]
    InvalidOffset(String),

    /// The checksum trailer does not match (only an error in strict mode).
    #[error("checksum mismatch: computed {computed:02X}, frame carries {received:?}")]
    ChecksumMismatch { computed: u8, received: String },

    /// Offset does not fit in the four control digits.
    #[error("offset {0} does not fit in four decimal digits")]
    OffsetOutOfRange(usize),

    /// The payload contains a frame delimiter and cannot be encoded.
    #[error("text contains reserved delimiter byte 0x{byte:02X} at index {index}")]
    ReservedByte { byte: u8, index: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// True for structural problems with a single frame.
    ///
    /// These are contained per frame: the frame is dropped and the stream
    /// stays usable.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            FrameError::TooShort { .. } | FrameError::BadMarker { .. } | FrameError::InvalidOffset(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
