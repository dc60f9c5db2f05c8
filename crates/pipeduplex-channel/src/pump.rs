use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pipeduplex_transport::ShutdownHandle;
use tracing::{debug, warn};

use crate::error::{ChannelError, Result};
use crate::source::MessageSource;

const THREAD_NAME: &str = "pipeduplex-recv";

impl MessageSource {
    /// Move the receive loop onto a dedicated thread.
    ///
    /// Messages are forwarded over a channel in arrival order. The current
    /// handler is replaced. The loop ends at end-of-stream, on a stream
    /// failure, when shut down, or once the [`ReceiveLoop`] is dropped, and
    /// the pipe is closed before the thread exits.
    pub fn spawn(mut self) -> Result<ReceiveLoop> {
        let (tx, messages) = mpsc::channel();
        let shutdown = self.shutdown_handle();
        let orphaned = self.shutdown_handle();
        self.set_handler(move |message| {
            if tx.send(message.to_owned()).is_err() {
                // Nobody is receiving; release the pipe so the peer sees EPIPE.
                warn!(size = message.len(), "receive loop dropped, discarding message");
                if let Err(err) = orphaned.shutdown() {
                    warn!(error = %err, "failed to stop orphaned receive loop");
                }
            }
        });

        let join = thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || {
                let result = self.run();
                if let Err(err) = self.close() {
                    warn!(error = %err, "failed to close source after receive loop");
                }
                debug!(ok = result.is_ok(), "receive thread exiting");
                result
            })
            .map_err(ChannelError::Spawn)?;

        Ok(ReceiveLoop {
            messages,
            shutdown,
            join: Some(join),
        })
    }
}

/// A receive loop running on its own thread.
///
/// Dropping it without [`join`](Self::join) shuts the loop down, which
/// releases the pipe.
pub struct ReceiveLoop {
    messages: Receiver<String>,
    shutdown: ShutdownHandle,
    join: Option<JoinHandle<Result<()>>>,
}

impl ReceiveLoop {
    /// Block for the next message. `None` once the loop has ended and every
    /// forwarded message has been taken.
    pub fn recv(&self) -> Option<String> {
        self.messages.recv().ok()
    }

    pub fn try_recv(&self) -> Option<String> {
        match self.messages.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for the next message.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<String> {
        match self.messages.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Iterate messages until the loop ends.
    pub fn iter(&self) -> impl Iterator<Item = String> + '_ {
        self.messages.iter()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Interrupt the loop. [`join`](Self::join) then reports
    /// [`ChannelError::Shutdown`] unless the loop had already finished.
    pub fn shutdown(&self) -> Result<()> {
        self.shutdown.shutdown()?;
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the loop thread and return how the loop ended.
    pub fn join(mut self) -> Result<()> {
        match self.join.take() {
            Some(join) => join.join().map_err(|_| ChannelError::LoopPanicked)?,
            None => Ok(()),
        }
    }
}

impl Drop for ReceiveLoop {
    fn drop(&mut self) {
        if self.join.is_none() {
            return;
        }
        if let Err(err) = self.shutdown.shutdown() {
            warn!(error = %err, "failed to stop receive loop on drop");
        }
    }
}

impl std::fmt::Debug for ReceiveLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiveLoop")
            .field("finished", &self.is_finished())
            .finish()
    }
}
