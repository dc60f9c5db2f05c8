use std::fmt;
use std::io;

use pipeduplex_channel::ChannelError;
use pipeduplex_frame::FrameError;
use pipeduplex_transport::TransportError;

// Exit code constants.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;
/// 128 + SIGINT.
pub const INTERRUPTED: i32 = 130;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound | io::ErrorKind::AlreadyExists => USAGE,
        io::ErrorKind::BrokenPipe => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { source, .. }
        | TransportError::Create { source, .. }
        | TransportError::Io(source) => io_error(context, source),
        TransportError::NotAFifo { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::EmbeddedDelimiter { .. }
        | FrameError::MessageTooLong { .. }
        | FrameError::LineTooLong { .. }
        | FrameError::InvalidUtf8(_)
        | FrameError::IncompleteLine { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn channel_error(context: &str, err: ChannelError) -> CliError {
    match err {
        ChannelError::Transport(err) => transport_error(context, err),
        ChannelError::Frame(err) => frame_error(context, err),
        ChannelError::Json(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        ChannelError::Shutdown => CliError::new(INTERRUPTED, format!("{context}: interrupted")),
        ChannelError::Closed | ChannelError::Faulted => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn missing_pipe_is_usage_error() {
        let err = channel_error(
            "open failed",
            ChannelError::Transport(TransportError::Open {
                path: PathBuf::from("/tmp/absent.fifo"),
                source: io::Error::from(io::ErrorKind::NotFound),
            }),
        );
        assert_eq!(err.code, USAGE);
        assert!(err.message.starts_with("open failed: "));
    }

    #[test]
    fn framing_violations_are_data_invalid() {
        let err = channel_error(
            "send failed",
            ChannelError::Frame(FrameError::EmbeddedDelimiter { position: 3 }),
        );
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn broken_pipe_is_failure() {
        let err = frame_error(
            "send failed",
            FrameError::Io(io::Error::from(io::ErrorKind::BrokenPipe)),
        );
        assert_eq!(err.code, FAILURE);
    }

    #[test]
    fn shutdown_is_interrupted() {
        let err = channel_error("receive failed", ChannelError::Shutdown);
        assert_eq!(err.code, INTERRUPTED);
    }

    #[test]
    fn not_a_fifo_is_usage_error() {
        let err = transport_error(
            "open failed",
            TransportError::NotAFifo {
                path: PathBuf::from("/etc/hosts"),
            },
        );
        assert_eq!(err.code, USAGE);
    }
}
