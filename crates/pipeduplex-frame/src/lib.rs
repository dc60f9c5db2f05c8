//! Newline-delimited message framing.
//!
//! Every message travels as UTF-8 text followed by a single `\n`:
//! - no length prefix, no escaping
//! - a message must not contain `\n` itself (rejected before writing)
//! - a trailing `\r` is ordinary content
//!
//! [`LineReader`] and [`LineWriter`] work over any `Read` / `Write`; callers
//! always see whole messages.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{decode_line, encode_line, FrameConfig, LineDecoder, DEFAULT_MAX_LINE, DELIMITER};
pub use error::{FrameError, Result};
pub use reader::LineReader;
pub use writer::LineWriter;
