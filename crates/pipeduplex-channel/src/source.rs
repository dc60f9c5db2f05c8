use std::path::Path;

use pipeduplex_frame::{FrameConfig, FrameError, LineReader};
use pipeduplex_transport::{PipeHandle, ShutdownHandle};
use serde::de::DeserializeOwned;
use tracing::{debug, info, trace, warn};

use crate::error::{ChannelError, Result};
use crate::state::EndpointState;

/// Dispatch target for received messages.
pub type Handler = Box<dyn FnMut(&str) + Send>;

fn noop_handler() -> Handler {
    Box::new(|_| {})
}

/// Reading half: receives framed messages and dispatches them to a handler.
///
/// The receive loop is synchronous. [`run`](Self::run) occupies the calling
/// thread and invokes the handler on that thread, one message at a time, in
/// the order the peer wrote them. The only way to stop a blocked loop before
/// the peer closes its end is a [`ShutdownHandle`] obtained from
/// [`shutdown_handle`](Self::shutdown_handle).
pub struct MessageSource {
    reader: LineReader<PipeHandle>,
    handler: Handler,
    shutdown: ShutdownHandle,
    state: EndpointState,
    faulted: bool,
}

impl MessageSource {
    /// Open an existing named pipe for reading.
    ///
    /// Blocks until a writer opens the other end.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, FrameConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: FrameConfig) -> Result<Self> {
        let handle = pipeduplex_transport::open_reader(path)?;
        let shutdown = handle.shutdown_handle()?;
        debug!(path = ?handle.path(), "message source open");
        Ok(Self {
            reader: LineReader::with_config(handle, config),
            handler: noop_handler(),
            shutdown,
            state: EndpointState::Open,
            faulted: false,
        })
    }

    /// Replace the dispatch target for all messages received from now on.
    pub fn set_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.handler = Box::new(handler);
    }

    /// Block until one message or end-of-stream.
    ///
    /// Returns `Ok(None)` once the peer has closed its write end and every
    /// buffered message has been returned.
    pub fn receive_one(&mut self) -> Result<Option<String>> {
        self.ensure_usable()?;
        match self.reader.read_line() {
            Ok(Some(message)) => {
                trace!(size = message.len(), "message received");
                Ok(Some(message))
            }
            Ok(None) => {
                debug!(path = ?self.path(), "end of stream");
                Ok(None)
            }
            Err(err) if err.is_shutdown() => {
                self.release_after_shutdown();
                Err(ChannelError::Shutdown)
            }
            Err(err) => Err(self.record_failure(err)),
        }
    }

    /// Receive one message and parse it as JSON.
    ///
    /// A message that is not valid JSON is consumed and reported without
    /// faulting the source.
    pub fn receive_json<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        match self.receive_one()? {
            Some(message) => Ok(Some(serde_json::from_str(&message)?)),
            None => Ok(None),
        }
    }

    /// Receive one message and hand it to the current handler.
    ///
    /// Returns `Ok(false)` at end-of-stream without calling the handler.
    pub fn dispatch_next(&mut self) -> Result<bool> {
        match self.receive_one()? {
            Some(message) => {
                (self.handler)(&message);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Dispatch every message until the peer closes its write end.
    pub fn run(&mut self) -> Result<()> {
        let mut dispatched = 0u64;
        while self.dispatch_next()? {
            dispatched += 1;
        }
        info!(path = ?self.path(), dispatched, "receive loop finished");
        Ok(())
    }

    /// A cloneable handle that stops a blocked [`receive_one`](Self::receive_one)
    /// or [`run`](Self::run) from any thread.
    ///
    /// The interrupted call returns [`ChannelError::Shutdown`] and the source
    /// releases its pipe handle.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Release the pipe handle. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.state == EndpointState::Closed {
            return Ok(());
        }
        self.state = EndpointState::Closed;
        self.reader.get_mut().close()?;
        Ok(())
    }

    pub fn state(&self) -> EndpointState {
        self.state
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// The pipe path this source reads from.
    pub fn path(&self) -> &Path {
        self.reader.get_ref().path()
    }

    pub fn config(&self) -> &FrameConfig {
        self.reader.config()
    }

    pub fn set_max_line_length(&mut self, max_line_length: usize) {
        self.reader.set_max_line_length(max_line_length);
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
            warn!(path = ?self.path(), error = %err, "message source faulted");
            self.faulted = true;
        }
        ChannelError::Frame(err)
    }

    fn release_after_shutdown(&mut self) {
        debug!(path = ?self.path(), "receive interrupted by shutdown");
        if let Err(err) = self.close() {
            warn!(error = %err, "failed to release pipe after shutdown");
        }
    }
}

impl Drop for MessageSource {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "failed to close message source on drop");
        }
    }
}

impl std::fmt::Debug for MessageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageSource")
            .field("path", &self.path())
            .field("state", &self.state)
            .field("faulted", &self.faulted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::sink::MessageSink;
    use crate::testutil::{make_dir, make_fifo, open_pair};

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl FnMut(&str) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |message: &str| {
            sink.lock().unwrap().push(message.to_owned())
        })
    }

    #[test]
    fn round_trip_preserves_messages() {
        let dir = make_dir("source-roundtrip");
        let fifo = make_fifo(&dir, "rt.fifo");
        let (mut source, mut sink) = open_pair(&fifo);

        let messages = ["hello", "", "  spaced  ", "tab\tseparated", "ünïcødé ✓", "cr\r"];
        for message in messages {
            sink.send(message).unwrap();
        }
        for message in messages {
            assert_eq!(source.receive_one().unwrap().as_deref(), Some(message));
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn run_dispatches_in_order_until_end_of_stream() {
        let dir = make_dir("source-run");
        let fifo = make_fifo(&dir, "run.fifo");
        let (mut source, mut sink) = open_pair(&fifo);
        let (seen, handler) = recorder();
        source.set_handler(handler);

        let writer = thread::spawn(move || {
            for i in 0..100 {
                sink.send(&format!("msg-{i}")).unwrap();
            }
            sink.close().unwrap();
        });

        source.run().unwrap();
        writer.join().unwrap();

        let expected: Vec<String> = (0..100).map(|i| format!("msg-{i}")).collect();
        assert_eq!(*seen.lock().unwrap(), expected);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn run_returns_without_dispatch_when_peer_sends_nothing() {
        let dir = make_dir("source-empty");
        let fifo = make_fifo(&dir, "empty.fifo");
        let (mut source, mut sink) = open_pair(&fifo);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        source.set_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sink.close().unwrap();
        source.run().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.state(), EndpointState::Open);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn replaced_handler_only_sees_later_messages() {
        let dir = make_dir("source-swap");
        let fifo = make_fifo(&dir, "swap.fifo");
        let (mut source, mut sink) = open_pair(&fifo);

        for message in ["one", "two", "three"] {
            sink.send(message).unwrap();
        }
        sink.close().unwrap();

        let (first_seen, first) = recorder();
        let (second_seen, second) = recorder();

        source.set_handler(first);
        assert!(source.dispatch_next().unwrap());
        source.set_handler(second);
        source.run().unwrap();

        assert_eq!(*first_seen.lock().unwrap(), vec!["one"]);
        assert_eq!(*second_seen.lock().unwrap(), vec!["two", "three"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn default_handler_is_noop() {
        let dir = make_dir("source-noop");
        let fifo = make_fifo(&dir, "noop.fifo");
        let (mut source, mut sink) = open_pair(&fifo);

        sink.send("ignored").unwrap();
        sink.close().unwrap();

        assert!(source.dispatch_next().unwrap());
        assert!(!source.dispatch_next().unwrap());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn handler_replies_through_second_sink() {
        let dir = make_dir("source-pingpong");
        let requests = make_fifo(&dir, "requests.fifo");
        let replies = make_fifo(&dir, "replies.fifo");

        let worker = {
            let requests = requests.clone();
            let replies = replies.clone();
            thread::spawn(move || {
                let mut source = MessageSource::open(&requests).unwrap();
                let mut reply_sink = MessageSink::open(&replies).unwrap();
                source.set_handler(move |message| {
                    if message == "ping" {
                        reply_sink.send("pong").unwrap();
                    }
                });
                source.run().unwrap();
            })
        };

        let mut client = MessageSink::open(&requests).unwrap();
        let mut reply_source = MessageSource::open(&replies).unwrap();

        client.send("ping").unwrap();
        client.close().unwrap();
        worker.join().unwrap();

        let mut replies_seen = Vec::new();
        while let Some(reply) = reply_source.receive_one().unwrap() {
            replies_seen.push(reply);
        }
        assert_eq!(replies_seen, vec!["pong"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn close_is_idempotent_and_rejects_receive() {
        let dir = make_dir("source-close");
        let fifo = make_fifo(&dir, "close.fifo");
        let (mut source, _sink) = open_pair(&fifo);

        source.close().unwrap();
        source.close().unwrap();
        assert_eq!(source.state(), EndpointState::Closed);
        assert!(matches!(source.receive_one(), Err(ChannelError::Closed)));
        assert!(matches!(source.run(), Err(ChannelError::Closed)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn shutdown_unblocks_run() {
        let dir = make_dir("source-shutdown");
        let fifo = make_fifo(&dir, "shutdown.fifo");
        let (mut source, sink) = open_pair(&fifo);
        let shutdown = source.shutdown_handle();

        let looping = thread::spawn(move || {
            let result = source.run();
            (result, source)
        });

        thread::sleep(Duration::from_millis(50));
        shutdown.shutdown().unwrap();

        let (result, mut source) = looping.join().unwrap();
        assert!(matches!(result, Err(ChannelError::Shutdown)));
        assert_eq!(source.state(), EndpointState::Closed);
        source.close().unwrap();
        drop(sink);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn truncated_line_faults_source() {
        let dir = make_dir("source-truncated");
        let fifo = make_fifo(&dir, "trunc.fifo");

        let raw_path = fifo.clone();
        let raw_writer = thread::spawn(move || {
            let mut raw = pipeduplex_transport::open_writer(raw_path).unwrap();
            raw.write_all(b"complete\npartial").unwrap();
            raw.close().unwrap();
        });
        let mut source = MessageSource::open(&fifo).unwrap();
        raw_writer.join().unwrap();

        assert_eq!(source.receive_one().unwrap().as_deref(), Some("complete"));
        let err = source.receive_one().unwrap_err();
        assert!(matches!(
            err,
            ChannelError::Frame(FrameError::IncompleteLine { len: 7 })
        ));
        assert!(source.is_faulted());
        assert!(matches!(source.receive_one(), Err(ChannelError::Faulted)));
        source.close().unwrap();

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn invalid_utf8_does_not_fault() {
        let dir = make_dir("source-utf8");
        let fifo = make_fifo(&dir, "utf8.fifo");

        let raw_path = fifo.clone();
        let raw_writer = thread::spawn(move || {
            let mut raw = pipeduplex_transport::open_writer(raw_path).unwrap();
            raw.write_all(&[0xFF, b'\n']).unwrap();
            raw.write_all(b"valid\n").unwrap();
        });
        let mut source = MessageSource::open(&fifo).unwrap();
        raw_writer.join().unwrap();

        let err = source.receive_one().unwrap_err();
        assert!(matches!(err, ChannelError::Frame(FrameError::InvalidUtf8(_))));
        assert!(!source.is_faulted());
        assert_eq!(source.receive_one().unwrap().as_deref(), Some("valid"));
        assert!(source.receive_one().unwrap().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn receive_json_parses_messages() {
        let dir = make_dir("source-json");
        let fifo = make_fifo(&dir, "json.fifo");
        let (mut source, mut sink) = open_pair(&fifo);

        sink.send(r#"{"id":7,"ok":true}"#).unwrap();
        sink.send("not json").unwrap();
        sink.close().unwrap();

        let value: serde_json::Value = source.receive_json().unwrap().unwrap();
        assert_eq!(value["id"], 7);
        let err = source.receive_json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, ChannelError::Json(_)));
        assert!(!source.is_faulted());
        assert!(source.receive_json::<serde_json::Value>().unwrap().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
