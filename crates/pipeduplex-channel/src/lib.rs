//! Duplex line messaging over a pair of named pipes.
//!
//! - [`MessageSink`] frames and flushes outbound messages.
//! - [`MessageSource`] blocks on inbound messages and dispatches them to a
//!   handler, one at a time, on the calling thread.
//! - [`DuplexChannel`] owns one of each and opens and closes them together.
//!
//! ```no_run
//! use pipeduplex_channel::DuplexChannel;
//!
//! let mut channel = DuplexChannel::open("/tmp/worker.in", "/tmp/worker.out")?;
//! channel.serve(|request, replies| replies.send(&request.to_uppercase()))?;
//! channel.close()?;
//! # Ok::<(), pipeduplex_channel::ChannelError>(())
//! ```
//!
//! Pipes are created by the orchestrating process (see
//! [`pipeduplex_transport::create_fifo`]); endpoints only open existing paths.

pub mod config;
pub mod error;
pub mod state;

#[cfg(unix)]
pub mod duplex;
#[cfg(unix)]
pub mod pump;
#[cfg(unix)]
pub mod sink;
#[cfg(unix)]
pub mod source;

#[cfg(all(test, unix))]
mod testutil;

pub use config::{ChannelConfig, OpenOrder};
pub use error::{ChannelError, CloseFailures, Result};
pub use state::EndpointState;

#[cfg(unix)]
pub use duplex::DuplexChannel;
#[cfg(unix)]
pub use pump::ReceiveLoop;
#[cfg(unix)]
pub use sink::MessageSink;
#[cfg(unix)]
pub use source::{Handler, MessageSource};

pub use pipeduplex_frame::{FrameConfig, DEFAULT_MAX_LINE};
#[cfg(unix)]
pub use pipeduplex_transport::ShutdownHandle;
