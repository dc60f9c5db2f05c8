use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{encode_line, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes newline-terminated messages to any `Write` stream.
///
/// Every [`send`](Self::send) writes one whole line and flushes before
/// returning; nothing is held back for coalescing.
pub struct LineWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> LineWriter<T> {
    /// Create a new line writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new line writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Frame and send one message (blocking).
    ///
    /// The message is validated before anything is written: it must not
    /// contain a newline and must fit `max_line_length`.
    pub fn send(&mut self, message: &str) -> Result<()> {
        if message.len() > self.config.max_line_length {
            return Err(FrameError::MessageTooLong {
                size: message.len(),
                max: self.config.max_line_length,
            });
        }

        self.buf.clear();
        encode_line(message, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        trace!(size = message.len(), "sent line");
        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum message length for subsequent sends.
    pub fn set_max_line_length(&mut self, max_line_length: usize) {
        self.config.max_line_length = max_line_length;
    }

    /// Current line writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::reader::LineReader;

    #[test]
    fn write_single_line() {
        let mut writer = LineWriter::new(Cursor::new(Vec::<u8>::new()));

        writer.send("hello").unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire, b"hello\n");
    }

    #[test]
    fn write_multiple_lines_in_order() {
        let mut writer = LineWriter::new(Cursor::new(Vec::<u8>::new()));

        writer.send("one").unwrap();
        writer.send("two").unwrap();
        writer.send("three").unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire, b"one\ntwo\nthree\n");
    }

    #[test]
    fn embedded_newline_rejected_without_writing() {
        let mut writer = LineWriter::new(Cursor::new(Vec::<u8>::new()));

        let err = writer.send("bad\nmessage").unwrap_err();
        assert!(matches!(err, FrameError::EmbeddedDelimiter { position: 3 }));
        assert!(!err.is_stream_fault());
        assert!(writer.into_inner().into_inner().is_empty());
    }

    #[test]
    fn message_too_long_rejected() {
        let cfg = FrameConfig { max_line_length: 4 };
        let mut writer = LineWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);

        let err = writer.send("oversized").unwrap_err();
        assert!(matches!(err, FrameError::MessageTooLong { size: 9, max: 4 }));
        assert!(!err.is_stream_fault());
        assert!(writer.into_inner().into_inner().is_empty());
    }

    #[test]
    fn every_send_flushes() {
        let sink = FlushTrackingWriter::default();
        let flushes = Arc::clone(&sink.flushes);
        let mut writer = LineWriter::new(sink);

        writer.send("a").unwrap();
        writer.send("b").unwrap();

        assert_eq!(flushes.load(Ordering::SeqCst), 2);
        assert_eq!(writer.get_ref().data, b"a\nb\n");
    }

    #[test]
    fn flush_failure_propagates() {
        let failed = Arc::new(AtomicBool::new(false));
        let mut writer = LineWriter::new(FailingFlush {
            failed: Arc::clone(&failed),
        });

        let err = writer.send("x").unwrap_err();
        assert!(matches!(err, FrameError::Io(ref e) if e.kind() == ErrorKind::BrokenPipe));
        assert!(failed.load(Ordering::SeqCst));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut writer = LineWriter::new(Cursor::new(Vec::<u8>::new()));

        writer.set_max_line_length(8);
        assert_eq!(writer.config().max_line_length, 8);
        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _inner = writer.into_inner();
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        };

        let mut writer = LineWriter::new(writer_impl);
        writer.send("retry").unwrap();

        assert_eq!(writer.into_inner().data, b"retry\n");
    }

    #[test]
    fn short_writes_are_completed() {
        let mut writer = LineWriter::new(OneByteWriter { data: Vec::new() });
        writer.send("trickle").unwrap();
        assert_eq!(writer.into_inner().data, b"trickle\n");
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = LineWriter::new(ZeroWriter);
        let err = writer.send("x").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
        assert!(err.is_stream_fault());
    }

    #[test]
    fn written_lines_decode() {
        let mut writer = LineWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send("z").unwrap();
        writer.send("").unwrap();

        let wire = writer.into_inner().into_inner();
        let mut reader = LineReader::new(Cursor::new(wire));
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("z"));
        assert_eq!(reader.read_line().unwrap().as_deref(), Some(""));
        assert!(reader.read_line().unwrap().is_none());
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushes: Arc<AtomicUsize>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingFlush {
        failed: Arc<AtomicBool>,
    }

    impl Write for FailingFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.failed.store(true, Ordering::SeqCst);
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct OneByteWriter {
        data: Vec<u8>,
    }

    impl Write for OneByteWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            match buf.first() {
                Some(byte) => {
                    self.data.push(*byte);
                    Ok(1)
                }
                None => Ok(0),
            }
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
