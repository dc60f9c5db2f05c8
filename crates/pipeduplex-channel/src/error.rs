use std::fmt;

/// Errors that can occur on message endpoints.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Transport-level error (open, close, shutdown wiring).
    #[error("transport error: {0}")]
    Transport(#[from] pipeduplex_transport::TransportError),

    /// Framing or stream I/O error.
    #[error("frame error: {0}")]
    Frame(#[from] pipeduplex_frame::FrameError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The endpoint has been closed.
    #[error("endpoint is closed")]
    Closed,

    /// An earlier stream failure left the endpoint unusable.
    #[error("endpoint faulted by an earlier I/O failure; close and reopen it")]
    Faulted,

    /// The receive loop was interrupted through its shutdown handle.
    #[error("receive loop shut down")]
    Shutdown,

    /// One half failed to open and releasing the other half failed too.
    #[error("open failed: {open}; cleanup close also failed: {cleanup}")]
    PartialOpen {
        open: Box<ChannelError>,
        cleanup: Box<ChannelError>,
    },

    /// Closing one or both halves of a duplex channel failed.
    #[error("close failed: {0}")]
    CloseFailed(CloseFailures),

    /// The receive loop thread could not be started.
    #[error("failed to spawn receive loop: {0}")]
    Spawn(std::io::Error),

    /// The receive loop thread panicked.
    #[error("receive loop panicked")]
    LoopPanicked,
}

/// Per-half close failures of a [`DuplexChannel`](crate::DuplexChannel).
///
/// Both halves are always closed; each failure is kept.
#[derive(Debug, Default)]
pub struct CloseFailures {
    pub reader: Option<Box<ChannelError>>,
    pub writer: Option<Box<ChannelError>>,
}

impl CloseFailures {
    pub fn is_empty(&self) -> bool {
        self.reader.is_none() && self.writer.is_none()
    }
}

impl fmt::Display for CloseFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.reader, &self.writer) {
            (Some(reader), Some(writer)) => write!(f, "reader: {reader}; writer: {writer}"),
            (Some(reader), None) => write!(f, "reader: {reader}"),
            (None, Some(writer)) => write!(f, "writer: {writer}"),
            (None, None) => write!(f, "no failures"),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
