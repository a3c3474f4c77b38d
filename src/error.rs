//! Process-level errors
//!
//! Only failures that end the daemon live here. Device- and client-scoped
//! problems are logged where they happen and never reach this type.

use std::path::PathBuf;

use thiserror::Error;

use crate::constants::{EX_OSERR, EX_USAGE};

/// Fatal error surfaced to `main`
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("{0}")]
    Usage(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("unable to open any event device")]
    NoDevices,
    #[error("unable to set up listening socket {path}: {source}")]
    Socket {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to switch to user {user}: {reason}")]
    Privileges { user: String, reason: String },
    #[error("unable to run in the background: {0}")]
    Daemonize(#[source] nix::Error),
}

impl DaemonError {
    /// sysexits-style process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            DaemonError::Usage(_) | DaemonError::Config(_) => EX_USAGE,
            _ => EX_OSERR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_errors_map_to_ex_usage() {
        assert_eq!(DaemonError::Usage("no devices".into()).exit_code(), EX_USAGE);
        assert_eq!(DaemonError::Config("bad".into()).exit_code(), EX_USAGE);
    }

    #[test]
    fn test_runtime_errors_map_to_ex_oserr() {
        assert_eq!(DaemonError::NoDevices.exit_code(), EX_OSERR);
        let err = DaemonError::Socket {
            path: PathBuf::from("/run/lirc/lircd"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.exit_code(), EX_OSERR);
        assert!(err.to_string().contains("/run/lirc/lircd"));
    }
}
