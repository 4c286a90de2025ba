/// Errors that can occur while maintaining the scoreboard.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// A patch would write past the end of the scoreboard buffer.
    #[error("patch at offset {offset} with {len} bytes exceeds scoreboard size {size}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] rtdlink_frame::FrameError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] rtdlink_transport::TransportError),
}

impl BoardError {
    pub(crate) fn io(err: std::io::Error) -> Self {
        BoardError::Transport(rtdlink_transport::TransportError::Io(err))
    }
}

pub type Result<T> = std::result::Result<T, BoardError>;
