//! Named pipe transport for pipeduplex.
//!
//! Opens existing FIFOs as owned, unidirectional [`PipeHandle`]s. Read
//! handles wait in `poll(2)` so that a [`ShutdownHandle`] can interrupt them
//! from another thread.
//!
//! This is the lowest layer of pipeduplex. Everything else builds on top of
//! the handles provided here.

pub mod error;

#[cfg(unix)]
pub mod fifo;
#[cfg(unix)]
pub mod handle;
#[cfg(unix)]
pub mod wake;

pub use error::{Result, TransportError};

#[cfg(unix)]
pub use fifo::{create_fifo, is_fifo, open_reader, open_writer, DEFAULT_FIFO_MODE};
#[cfg(unix)]
pub use handle::{Direction, PipeHandle};
#[cfg(unix)]
pub use wake::{is_shutdown_error, ShutdownHandle};
