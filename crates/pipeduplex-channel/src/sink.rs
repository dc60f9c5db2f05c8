use std::path::Path;

use pipeduplex_frame::{FrameConfig, FrameError, LineWriter};
use pipeduplex_transport::PipeHandle;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::error::{ChannelError, Result};
use crate::state::EndpointState;

/// Writing half: frames and flushes one message at a time.
pub struct MessageSink {
    writer: LineWriter<PipeHandle>,
    state: EndpointState,
    faulted: bool,
}

impl MessageSink {
    /// Open an existing named pipe for writing.
    ///
    /// Blocks until a reader opens the other end.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, FrameConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: FrameConfig) -> Result<Self> {
        let handle = pipeduplex_transport::open_writer(path)?;
        debug!(path = ?handle.path(), "message sink open");
        Ok(Self {
            writer: LineWriter::with_config(handle, config),
            state: EndpointState::Open,
            faulted: false,
        })
    }

    /// Send one message and flush it to the pipe.
    ///
    /// After a write or flush failure the sink is faulted and rejects
    /// further sends with [`ChannelError::Faulted`] until it is closed.
    pub fn send(&mut self, message: &str) -> Result<()> {
        self.ensure_usable()?;
        self.writer
            .send(message)
            .map_err(|err| self.record_failure(err))?;
        trace!(size = message.len(), "message sent");
        Ok(())
    }

    /// Serialize `value` as compact JSON and send it as one message.
    pub fn send_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let line = serde_json::to_string(value)?;
        self.send(&line)
    }

    /// Release the pipe handle. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.state == EndpointState::Closed {
            return Ok(());
        }
        self.state = EndpointState::Closed;
        self.writer.get_mut().close()?;
        Ok(())
    }

    pub fn state(&self) -> EndpointState {
        self.state
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// The pipe path this sink writes to.
    pub fn path(&self) -> &Path {
        self.writer.get_ref().path()
    }

    pub fn config(&self) -> &FrameConfig {
        self.writer.config()
    }

    pub fn set_max_line_length(&mut self, max_line_length: usize) {
        self.writer.set_max_line_length(max_line_length);
    }

    fn ensure_usable(&self) -> Result<()> {
        match (self.state, self.faulted) {
            (EndpointState::Closed, _) => Err(ChannelError::Closed),
            (EndpointState::Open, true) => Err(ChannelError::Faulted),
            (EndpointState::Open, false) => Ok(()),
        }
    }

    fn record_failure(&mut self, err: FrameError) -> ChannelError {
        if err.is_stream_fault() {
            warn!(path = ?self.path(), error = %err, "message sink faulted");
            self.faulted = true;
        }
        ChannelError::Frame(err)
    }
}

impl Drop for MessageSink {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "failed to close message sink on drop");
        }
    }
}

impl std::fmt::Debug for MessageSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageSink")
            .field("path", &self.path())
            .field("state", &self.state)
            .field("faulted", &self.faulted)
            .finish()
    }
}
