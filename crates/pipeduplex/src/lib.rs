//! Duplex line-delimited messaging over named pipes.
//!
//! Two processes that share a pair of FIFOs exchange newline-terminated
//! UTF-8 messages. Each side reads from one pipe and writes to the other.
//!
//! # Crate Structure
//!
//! - [`transport`]: FIFO creation and owned, interruptible pipe handles
//! - [`frame`]: newline framing over any `Read` / `Write`
//! - [`channel`]: message sink, message source and duplex channel (behind
//!   the default `channel` feature)

/// Re-export transport types.
pub mod transport {
    pub use pipeduplex_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use pipeduplex_frame::*;
}

/// Re-export channel types (requires `channel` feature).
#[cfg(feature = "channel")]
pub mod channel {
    pub use pipeduplex_channel::*;
}
