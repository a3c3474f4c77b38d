//! Listening socket
//!
//! Binds the Unix stream socket clients connect to. A leftover socket
//! file from a previous run is replaced, and the file is removed again
//! when the socket is dropped.

use log::{debug, info};
use std::fs::{self, DirBuilder, Permissions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::os::unix::io::{AsFd, BorrowedFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use crate::error::DaemonError;

/// Mode of a parent directory created for the socket
const SOCKET_DIR_MODE: u32 = 0o755;

/// Any local user may connect
const SOCKET_MODE: u32 = 0o666;

pub struct ListenSocket {
    listener: UnixListener,
    path: PathBuf,
}

impl ListenSocket {
    /// Bind a non-blocking listener at `path`
    pub fn bind(path: &Path) -> Result<Self, DaemonError> {
        let wrap = |source: io::Error| DaemonError::Socket {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                DirBuilder::new()
                    .recursive(true)
                    .mode(SOCKET_DIR_MODE)
                    .create(parent)
                    .map_err(wrap)?;
                debug!("Created {}", parent.display());
            }
        }

        match fs::remove_file(path) {
            Ok(()) => debug!("Removed stale socket {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(wrap(e)),
        }

        let listener = UnixListener::bind(path).map_err(wrap)?;
        fs::set_permissions(path, Permissions::from_mode(SOCKET_MODE)).map_err(wrap)?;
        listener.set_nonblocking(true).map_err(wrap)?;

        info!("Listening on {}", path.display());
        Ok(Self {
            listener,
            path: path.to_path_buf(),
        })
    }

    /// Wrap a socket that is not listening, so every accept fails
    #[cfg(test)]
    pub fn from_stream(stream: UnixStream, path: &Path) -> Self {
        use std::os::unix::io::OwnedFd;
        Self {
            listener: UnixListener::from(OwnedFd::from(stream)),
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept one pending connection, `None` when nothing is waiting
    pub fn accept(&self) -> io::Result<Option<UnixStream>> {
        match self.listener.accept() {
            Ok((stream, _)) => Ok(Some(stream)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl AsFd for ListenSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.listener.as_fd()
    }
}

impl Drop for ListenSocket {
    fn drop(&mut self) {
        // May fail once privileges are dropped; nothing to do about it then
        if let Err(e) = fs::remove_file(&self.path) {
            debug!("Could not remove {}: {}", self.path.display(), e);
        }
    }
}
