use std::path::PathBuf;

/// Errors that can occur in pipe transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the pipe at the specified path.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The path exists but is not a named pipe.
    #[error("not a named pipe: {path}")]
    NotAFifo { path: PathBuf },

    /// Failed to create a named pipe.
    #[error("failed to create fifo {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Releasing the pipe handle failed.
    #[error("failed to close {path}: {source}")]
    Close {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on an open pipe handle.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The handle is not the read end of a pipe.
    #[error("{path} is not open for reading")]
    NotReadable { path: PathBuf },

    /// The handle was shut down from another thread.
    #[error("transport shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TransportError>;
