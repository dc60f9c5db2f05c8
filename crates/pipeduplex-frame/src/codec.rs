use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// The line delimiter.
pub const DELIMITER: u8 = b'\n';

/// Default maximum line length (excluding the delimiter): 16 MiB.
pub const DEFAULT_MAX_LINE: usize = 16 * 1024 * 1024;

/// Encode a message into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────────────────┬────────┐
/// │ Message (UTF-8, no newline)  │ 0x0A   │
/// └──────────────────────────────┴────────┘
/// ```
///
/// Nothing is written to `dst` if the message contains the delimiter.
pub fn encode_line(message: &str, dst: &mut BytesMut) -> Result<()> {
    if let Some(position) = message.bytes().position(|b| b == DELIMITER) {
        return Err(FrameError::EmbeddedDelimiter { position });
    }
    dst.reserve(message.len() + 1);
    dst.put_slice(message.as_bytes());
    dst.put_u8(DELIMITER);
    Ok(())
}

/// Decode one line from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete line yet.
/// On success, consumes the line and its delimiter from the buffer.
pub fn decode_line(src: &mut BytesMut, max_line_length: usize) -> Result<Option<String>> {
    LineDecoder::default().decode(src, max_line_length)
}

/// Incremental line decoder.
///
/// Remembers how far the buffer has already been searched so that a long
/// line arriving in many reads is scanned once.
#[derive(Debug, Default, Clone)]
pub struct LineDecoder {
    next_index: usize,
}

impl LineDecoder {
    pub fn decode(&mut self, src: &mut BytesMut, max_line_length: usize) -> Result<Option<String>> {
        let start = self.next_index.min(src.len());
        match src[start..].iter().position(|b| *b == DELIMITER) {
            Some(offset) => {
                let len = start + offset;
                self.next_index = 0;
                if len > max_line_length {
                    return Err(FrameError::LineTooLong {
                        size: len,
                        max: max_line_length,
                    });
                }

                let line = src.split_to(len + 1);
                let text = std::str::from_utf8(&line[..len])?;
                Ok(Some(text.to_owned()))
            }
            None if src.len() > max_line_length => {
                self.next_index = 0;
                Err(FrameError::LineTooLong {
                    size: src.len(),
                    max: max_line_length,
                })
            }
            None => {
                self.next_index = src.len();
                Ok(None)
            }
        }
    }
}

/// Configuration for line framing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum message length in bytes, excluding the delimiter. Default: 16 MiB.
    pub max_line_length: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE,
        }
    }
}
