use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{FrameConfig, LineDecoder};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete lines from any `Read` stream.
///
/// Handles partial reads internally; callers always get whole messages with
/// the delimiter stripped.
pub struct LineReader<T> {
    inner: T,
    buf: BytesMut,
    decoder: LineDecoder,
    config: FrameConfig,
}

impl<T: Read> LineReader<T> {
    /// Create a new line reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new line reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            decoder: LineDecoder::default(),
            config,
        }
    }

    /// Read the next complete line (blocking).
    ///
    /// Returns `Ok(None)` on a clean end-of-stream, and
    /// `Err(FrameError::IncompleteLine)` if the stream ends mid-line.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(line) = self
                .decoder
                .decode(&mut self.buf, self.config.max_line_length)?
            {
                trace!(size = line.len(), "decoded line");
                return Ok(Some(line));
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(FrameError::IncompleteLine {
                    len: self.buf.len(),
                });
            }

            self.buf.extend_from_slice(&chunk[..read]);
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
    ///
    /// Buffered bytes that were not yet returned as a line are discarded.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum line length for subsequent decoding.
    pub fn set_max_line_length(&mut self, max_line_length: usize) {
        self.config.max_line_length = max_line_length;
    }

    /// Current line reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
