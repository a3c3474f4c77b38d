//! Process lifecycle
//!
//! Signal handling, privilege drop, background detach and systemd
//! readiness notification.

use log::{debug, info, warn};
use nix::unistd::{self, Uid, User};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::DaemonError;

/// Set from signal context, checked once per loop iteration
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Check if shutdown was requested (SIGTERM, SIGINT, or SIGHUP)
pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Relaxed)
}

/// Set up signal handlers (call once at startup)
///
/// SIGTERM, SIGINT and SIGHUP request a graceful shutdown. SIGPIPE is
/// ignored so a vanished client surfaces as a write error instead.
pub fn setup_signal_handlers() {
    unsafe {
        libc::signal(
            libc::SIGTERM,
            shutdown_signal_handler as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGINT,
            shutdown_signal_handler as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGHUP,
            shutdown_signal_handler as *const () as libc::sighandler_t,
        );
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}

extern "C" fn shutdown_signal_handler(_signo: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

/// Switch to `user` (group first, then user). A no-op unless running as root.
pub fn drop_privileges(user: &str) -> Result<(), DaemonError> {
    if !Uid::effective().is_root() {
        debug!("Not running as root, keeping current identity");
        return Ok(());
    }

    let failed = |reason: String| DaemonError::Privileges {
        user: user.to_string(),
        reason,
    };

    let account = User::from_name(user)
        .map_err(|e| failed(e.to_string()))?
        .ok_or_else(|| failed("no such user".to_string()))?;

    unistd::setgroups(&[account.gid]).map_err(|e| failed(format!("setgroups: {}", e)))?;
    unistd::setgid(account.gid).map_err(|e| failed(format!("setgid: {}", e)))?;
    unistd::setuid(account.uid).map_err(|e| failed(format!("setuid: {}", e)))?;

    info!("Running as {} (uid {}, gid {})", user, account.uid, account.gid);
    Ok(())
}

/// Detach into the background. stderr stays open for logging.
pub fn daemonize() -> Result<(), DaemonError> {
    unistd::daemon(false, true).map_err(DaemonError::Daemonize)
}

/// Tell systemd the daemon is serving
pub fn notify_ready() {
    if let Err(e) = sd_notify::notify(false, &[sd_notify::NotifyState::Ready]) {
        warn!("sd_notify READY failed: {}", e);
    }
}

pub fn notify_stopping() {
    let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Stopping]);
}
