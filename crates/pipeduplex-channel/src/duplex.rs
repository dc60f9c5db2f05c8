use std::path::Path;

use pipeduplex_transport::ShutdownHandle;
use tracing::{debug, info};

use crate::config::{ChannelConfig, OpenOrder};
use crate::error::{ChannelError, CloseFailures, Result};
use crate::sink::MessageSink;
use crate::source::MessageSource;
use crate::state::EndpointState;

/// One inbound and one outbound pipe, opened and closed together.
///
/// The channel exclusively owns both halves. Dropping it closes whatever is
/// still open; call [`close`](Self::close) to observe close failures.
#[derive(Debug)]
pub struct DuplexChannel {
    source: MessageSource,
    sink: MessageSink,
}

impl DuplexChannel {
    /// Open `inbound` for reading, then `outbound` for writing.
    ///
    /// The peer process must open the same pair in the opposite order.
    pub fn open(inbound: impl AsRef<Path>, outbound: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(inbound, outbound, ChannelConfig::default())
    }

    /// Open both halves in the order given by `config.open_order`.
    ///
    /// If the second half fails to open, the first is closed before the
    /// error is returned. When that close fails as well, both errors are
    /// reported through [`ChannelError::PartialOpen`].
    pub fn open_with_config(
        inbound: impl AsRef<Path>,
        outbound: impl AsRef<Path>,
        config: ChannelConfig,
    ) -> Result<Self> {
        let (inbound, outbound) = (inbound.as_ref(), outbound.as_ref());
        let channel = match config.open_order {
            OpenOrder::ReaderFirst => {
                let mut source = MessageSource::open_with_config(inbound, config.frame.clone())?;
                match MessageSink::open_with_config(outbound, config.frame) {
                    Ok(sink) => Self { source, sink },
                    Err(err) => return Err(abandon(err, source.close())),
                }
            }
            OpenOrder::WriterFirst => {
                let mut sink = MessageSink::open_with_config(outbound, config.frame.clone())?;
                match MessageSource::open_with_config(inbound, config.frame) {
                    Ok(source) => Self { source, sink },
                    Err(err) => return Err(abandon(err, sink.close())),
                }
            }
        };
        debug!(
            inbound = ?inbound,
            outbound = ?outbound,
            order = ?config.open_order,
            "duplex channel open"
        );
        Ok(channel)
    }

    /// Combine independently opened halves.
    pub fn from_parts(source: MessageSource, sink: MessageSink) -> Self {
        Self { source, sink }
    }

    pub fn into_parts(self) -> (MessageSource, MessageSink) {
        (self.source, self.sink)
    }

    /// The inbound half, for handler registration and receiving.
    pub fn source(&self) -> &MessageSource {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut MessageSource {
        &mut self.source
    }

    /// The outbound half, for sending.
    pub fn sink(&self) -> &MessageSink {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut MessageSink {
        &mut self.sink
    }

    /// Borrow both halves at once.
    pub fn parts_mut(&mut self) -> (&mut MessageSource, &mut MessageSink) {
        (&mut self.source, &mut self.sink)
    }

    pub fn send(&mut self, message: &str) -> Result<()> {
        self.sink.send(message)
    }

    pub fn receive_one(&mut self) -> Result<Option<String>> {
        self.source.receive_one()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.source.shutdown_handle()
    }

    /// Receive until end-of-stream, handing each message to `handler`
    /// together with the outbound half.
    ///
    /// The first handler error stops the loop and is returned.
    pub fn serve<F>(&mut self, mut handler: F) -> Result<()>
    where
        F: FnMut(&str, &mut MessageSink) -> Result<()>,
    {
        let mut served = 0u64;
        while let Some(message) = self.source.receive_one()? {
            handler(&message, &mut self.sink)?;
            served += 1;
        }
        info!(path = ?self.source.path(), served, "duplex channel drained");
        Ok(())
    }

    /// Close both halves. Both closes are always attempted.
    ///
    /// Closing an already closed channel is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let failures = CloseFailures {
            reader: self.source.close().err().map(Box::new),
            writer: self.sink.close().err().map(Box::new),
        };
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ChannelError::CloseFailed(failures))
        }
    }

    /// `Open` while both halves are open.
    pub fn state(&self) -> EndpointState {
        match (self.source.state(), self.sink.state()) {
            (EndpointState::Open, EndpointState::Open) => EndpointState::Open,
            _ => EndpointState::Closed,
        }
    }
}

fn abandon(open: ChannelError, cleanup: Result<()>) -> ChannelError {
    match cleanup {
        Ok(()) => open,
        Err(cleanup) => ChannelError::PartialOpen {
            open: Box::new(open),
            cleanup: Box::new(cleanup),
        },
    }
}
