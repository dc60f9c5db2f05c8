use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::handle::PipeHandle;

/// Default permission mode for created FIFOs.
pub const DEFAULT_FIFO_MODE: u32 = 0o600;

/// Create a named pipe at `path` with explicit permissions.
///
/// Endpoints never create pipes themselves; this is for the process that
/// sets up the pair before either side opens it.
pub fn create_fifo(path: impl AsRef<Path>, mode: u32) -> Result<()> {
    let path = path.as_ref();
    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| TransportError::Create {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
    })?;

    // SAFETY: `c_path` is a valid NUL-terminated string for the duration of the call.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), mode as libc::mode_t) };
    if rc != 0 {
        return Err(TransportError::Create {
            path: path.to_path_buf(),
            source: std::io::Error::last_os_error(),
        });
    }

    // mkfifo is subject to the umask; apply the requested mode exactly.
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
        TransportError::Create {
            path: path.to_path_buf(),
            source: e,
        }
    })?;

    info!(?path, mode = format_args!("{mode:o}"), "created fifo");
    Ok(())
}

/// Returns true if `path` exists and is a named pipe.
pub fn is_fifo(path: impl AsRef<Path>) -> bool {
    std::fs::metadata(path)
        .map(|metadata| metadata.file_type().is_fifo())
        .unwrap_or(false)
}

/// Open an existing named pipe for reading (blocking).
///
/// Blocks until a writer opens the other end.
pub fn open_reader(path: impl AsRef<Path>) -> Result<PipeHandle> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| TransportError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
    ensure_fifo(&file, path)?;

    debug!(?path, "opened fifo for reading");
    PipeHandle::reader(file, path.to_path_buf())
}

/// Open an existing named pipe for writing (blocking).
///
/// Blocks until a reader opens the other end. Never creates the path.
pub fn open_writer(path: impl AsRef<Path>) -> Result<PipeHandle> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| TransportError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
    ensure_fifo(&file, path)?;

    debug!(?path, "opened fifo for writing");
    Ok(PipeHandle::writer(file, path.to_path_buf()))
}

fn ensure_fifo(file: &File, path: &Path) -> Result<()> {
    let metadata = file.metadata().map_err(|e| TransportError::Open {
        path: path.to_path_buf(),
        source: e,
    })?;
    if !metadata.file_type().is_fifo() {
        return Err(TransportError::NotAFifo {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
