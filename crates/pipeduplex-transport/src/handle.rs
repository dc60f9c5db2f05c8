use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::wake::{shutdown_error, ShutdownHandle, WakePipe};

/// Which end of a named pipe a handle holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// An owned, unidirectional handle on a named pipe.
///
/// Implements `Read` for handles opened with [`open_reader`](crate::open_reader)
/// and `Write` for handles opened with [`open_writer`](crate::open_writer).
/// Read handles are switched to non-blocking mode and wait in `poll(2)` on
/// both the pipe and a wake pipe, so a [`ShutdownHandle`] can interrupt them
/// from another thread.
pub struct PipeHandle {
    file: Option<File>,
    path: PathBuf,
    direction: Direction,
    wake: Option<Arc<WakePipe>>,
}

impl PipeHandle {
    pub(crate) fn reader(file: File, path: PathBuf) -> Result<Self> {
        set_nonblocking(file.as_raw_fd())?;
        let wake = WakePipe::new()?;
        Ok(Self {
            file: Some(file),
            path,
            direction: Direction::Read,
            wake: Some(Arc::new(wake)),
        })
    }

    pub(crate) fn writer(file: File, path: PathBuf) -> Self {
        Self {
            file: Some(file),
            path,
            direction: Direction::Write,
            wake: None,
        }
    }

    /// The pipe path this handle was opened against.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether the underlying descriptor is still held.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// A handle that interrupts blocked reads on this read end.
    pub fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        self.wake
            .as_ref()
            .map(|wake| ShutdownHandle::new(Arc::clone(wake)))
            .ok_or_else(|| TransportError::NotReadable {
                path: self.path.clone(),
            })
    }

    /// Release the descriptor, reporting a failing `close(2)`.
    ///
    /// The handle is closed afterwards whether or not the call succeeded;
    /// closing an already closed handle is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };

        let fd = file.into_raw_fd();
        // SAFETY: `fd` was just released from the `File`, so this is its only owner
        // and it is closed exactly once here.
        let rc = unsafe { libc::close(fd) };
        if rc != 0 {
            return Err(TransportError::Close {
                path: self.path.clone(),
                source: io::Error::last_os_error(),
            });
        }

        debug!(path = ?self.path, direction = ?self.direction, "closed pipe handle");
        Ok(())
    }
}

impl Read for PipeHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let file = self.file.as_mut().ok_or_else(closed_error)?;
        let Some(wake) = &self.wake else {
            return file.read(buf);
        };

        loop {
            if wake.is_triggered() {
                return Err(shutdown_error());
            }
            match file.read(buf) {
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    wait_readable(file.as_raw_fd(), wake.read_fd())?;
                }
                other => return other,
            }
        }
    }
}

impl Write for PipeHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.as_mut().ok_or_else(closed_error)?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.as_mut().ok_or_else(closed_error)?.flush()
    }
}

impl std::fmt::Debug for PipeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeHandle")
            .field("path", &self.path)
            .field("direction", &self.direction)
            .field("open", &self.is_open())
            .finish()
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "pipe handle is closed")
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: `fd` is an open descriptor owned by the caller; F_GETFL takes no pointer.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: same descriptor, setting status flags only.
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Block until `fd` is readable (data, hang-up or error) or the wake pipe fires.
fn wait_readable(fd: RawFd, wake_fd: RawFd) -> io::Result<()> {
    let mut fds = [
        libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        },
        libc::pollfd {
            fd: wake_fd,
            events: libc::POLLIN,
            revents: 0,
        },
    ];

    loop {
        // SAFETY: `fds` is a valid array of two pollfd structs for the duration of the call.
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if fds[1].revents != 0 {
            return Err(shutdown_error());
        }
        if fds[0].revents != 0 {
            return Ok(());
        }
    }
}
