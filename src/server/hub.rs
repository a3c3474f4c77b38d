//! Connected clients
//!
//! Clients only ever receive. Each line goes out in a single write; a
//! client that cannot take the whole line right now (closed, erroring or
//! with a full buffer) is dropped so it cannot stall the others.

use log::{info, warn};
use std::io::{self, Write};
use std::os::unix::net::UnixStream;

use super::socket::ListenSocket;
use crate::error::DaemonError;

#[derive(Default)]
pub struct ClientHub {
    clients: Vec<UnixStream>,
}

impl ClientHub {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Accept every pending connection. Returns how many were added.
    /// Anything but an aborted or interrupted accept means the listener
    /// is unusable and is returned as an error.
    pub fn accept_pending(&mut self, listener: &ListenSocket) -> Result<usize, DaemonError> {
        let mut accepted = 0;
        loop {
            match listener.accept() {
                Ok(Some(stream)) => {
                    if let Err(e) = stream.set_nonblocking(true) {
                        warn!("Dropping client, cannot make it non-blocking: {}", e);
                        continue;
                    }
                    self.clients.push(stream);
                    accepted += 1;
                }
                Ok(None) => break,
                Err(e) if is_transient(&e) => break,
                Err(e) => {
                    return Err(DaemonError::Socket {
                        path: listener.path().to_path_buf(),
                        source: e,
                    })
                }
            }
        }
        if accepted > 0 {
            info!("Accepted {} client(s), {} connected", accepted, self.clients.len());
        }
        Ok(accepted)
    }

    /// Send `line` to every client, dropping the ones that cannot take it.
    /// Returns how many clients were dropped.
    pub fn broadcast(&mut self, line: &[u8]) -> usize {
        let before = self.clients.len();
        self.clients.retain_mut(|client| match client.write(line) {
            Ok(n) if n == line.len() => true,
            Ok(n) => {
                warn!("Short write to client ({} of {} bytes), disconnecting", n, line.len());
                false
            }
            Err(e) => {
                info!("Client disconnected: {}", e);
                false
            }
        });
        before - self.clients.len()
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted | io::ErrorKind::WouldBlock
    )
}
