/// Errors that can occur while framing or unframing lines.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An outbound message contains the line delimiter.
    #[error("message contains a newline at byte {position}")]
    EmbeddedDelimiter { position: usize },

    /// An outbound message exceeds the configured maximum.
    #[error("message too long ({size} bytes, max {max})")]
    MessageTooLong { size: usize, max: usize },

    /// An inbound line exceeds the configured maximum.
    #[error("line too long ({size} bytes, max {max})")]
    LineTooLong { size: usize, max: usize },

    /// An inbound line is not valid UTF-8.
    #[error("line is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The stream ended after a partial line.
    #[error("stream ended mid-line ({len} bytes without a newline)")]
    IncompleteLine { len: usize },

    /// An I/O error occurred while reading or writing lines.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream accepted no bytes.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether the stream is left in an unknown position.
    ///
    /// Outbound validation failures happen before any byte is written, and
    /// an invalid UTF-8 line has already been consumed whole; every other
    /// error leaves the stream unusable.
    pub fn is_stream_fault(&self) -> bool {
        !matches!(
            self,
            FrameError::EmbeddedDelimiter { .. }
                | FrameError::MessageTooLong { .. }
                | FrameError::InvalidUtf8(_)
        )
    }

    /// Whether this error came from a triggered shutdown handle.
    #[cfg(unix)]
    pub fn is_shutdown(&self) -> bool {
        matches!(self, FrameError::Io(err) if pipeduplex_transport::is_shutdown_error(err))
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
