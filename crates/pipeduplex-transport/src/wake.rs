use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, TransportError};

/// Self-pipe used to interrupt a reader blocked in `poll(2)`.
///
/// Once triggered the read end stays readable forever, so every later poll
/// returns immediately.
pub(crate) struct WakePipe {
    read: OwnedFd,
    write: OwnedFd,
    triggered: AtomicBool,
}

impl WakePipe {
    pub(crate) fn new() -> io::Result<Self> {
        let mut fds = [0 as libc::c_int; 2];
        create_pipe(&mut fds)?;

        // SAFETY: both descriptors were just returned by pipe(2) and nothing else owns them.
        let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };

        Ok(Self {
            read,
            write,
            triggered: AtomicBool::new(false),
        })
    }

    pub(crate) fn trigger(&self) -> io::Result<()> {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let byte = [1u8];
        loop {
            // SAFETY: `byte` is a valid one-byte buffer and `write` is an open descriptor.
            let rc = unsafe { libc::write(self.write.as_raw_fd(), byte.as_ptr().cast(), 1) };
            if rc >= 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    pub(crate) fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub(crate) fn read_fd(&self) -> RawFd {
        self.read.as_raw_fd()
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn create_pipe(fds: &mut [libc::c_int; 2]) -> io::Result<()> {
    // SAFETY: `fds` points to two writable c_ints as pipe2(2) requires.
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn create_pipe(fds: &mut [libc::c_int; 2]) -> io::Result<()> {
    // SAFETY: `fds` points to two writable c_ints as pipe(2) requires.
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    for fd in fds.iter() {
        // SAFETY: `fd` is an open descriptor returned by pipe(2) above.
        unsafe {
            libc::fcntl(*fd, libc::F_SETFD, libc::FD_CLOEXEC);
        }
    }
    Ok(())
}

/// Cross-thread handle that unblocks a reader waiting on its pipe.
///
/// Cloneable and `Send + Sync`. Triggering is idempotent; after the first
/// call every pending and future read on the owning handle fails with a
/// shutdown error (see [`is_shutdown_error`]).
#[derive(Clone)]
pub struct ShutdownHandle {
    wake: Arc<WakePipe>,
}

impl ShutdownHandle {
    pub(crate) fn new(wake: Arc<WakePipe>) -> Self {
        Self { wake }
    }

    /// Wake the reader and make it give up its pipe.
    pub fn shutdown(&self) -> Result<()> {
        debug!("shutdown requested");
        self.wake.trigger().map_err(TransportError::Io)
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutdown(&self) -> bool {
        self.wake.is_triggered()
    }
}

impl std::fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("triggered", &self.is_shutdown())
            .finish()
    }
}

pub(crate) fn shutdown_error() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, TransportError::Shutdown)
}

/// Returns true if `err` was produced by a triggered [`ShutdownHandle`].
pub fn is_shutdown_error(err: &io::Error) -> bool {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<TransportError>())
        .is_some_and(|inner| matches!(inner, TransportError::Shutdown))
}
