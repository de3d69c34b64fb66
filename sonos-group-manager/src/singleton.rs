//! Single-instance guard
//!
//! An exclusive, non-blocking lock on a PID file. The lock lives as long as
//! the returned [`PidLock`]; the OS drops it when the process exits.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ManagerError, Result};

#[derive(Debug)]
pub struct PidLock {
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl PidLock {
    /// Lock the PID file at `path` and write our PID into it
    ///
    /// The file is only truncated once the lock is held, so a failed attempt
    /// leaves the running instance's PID intact.
    pub fn acquire(path: &Path) -> Result<Self> {
        let path = path.to_path_buf();
        let pid_error = |source| ManagerError::PidFile {
            path: path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(pid_error)?;

        lock_exclusive(&file).map_err(|e| {
            if e.kind() == std::io::ErrorKind::WouldBlock {
                ManagerError::AlreadyRunning
            } else {
                pid_error(e)
            }
        })?;

        file.set_len(0).map_err(pid_error)?;
        writeln!(file, "{}", std::process::id()).map_err(pid_error)?;
        file.flush().map_err(pid_error)?;

        tracing::debug!(path = %path.display(), "PID file locked");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn lock_exclusive(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: the descriptor is owned by `file` and stays open for the call
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn lock_exclusive(_file: &File) -> std::io::Result<()> {
    tracing::warn!("PID file locking is not supported on this platform");
    Ok(())
}
