//! Input hotplug detection
//!
//! Watches udev for event nodes appearing in the input subsystem so a
//! replugged remote is picked up right away instead of at the next
//! periodic rescan.

use anyhow::{Context, Result};
use log::{debug, info};
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd};

use crate::constants::EVENT_NODE_PREFIX;

/// udev-based monitor for the input subsystem
pub struct HotplugMonitor {
    socket: udev::MonitorSocket,
}

impl HotplugMonitor {
    pub fn new() -> Result<Self> {
        let socket = udev::MonitorBuilder::new()
            .context("Failed to create udev monitor builder")?
            .match_subsystem("input")
            .context("Failed to match input subsystem")?
            .listen()
            .context("Failed to start udev monitor")?;

        info!("Input hotplug monitor initialized");
        Ok(Self { socket })
    }

    /// Drain pending udev events (non-blocking).
    ///
    /// Returns true if an event node was added since the last call.
    pub fn poll(&mut self) -> bool {
        let mut added = false;
        for event in self.socket.iter() {
            let is_add = event.action().map(|a| a == "add").unwrap_or(false);
            let is_event_node = event
                .devnode()
                .and_then(|node| node.file_name())
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.starts_with(EVENT_NODE_PREFIX));
            if is_add && is_event_node {
                debug!("Input device added: {:?}", event.devpath().to_string_lossy());
                added = true;
            }
        }
        added
    }
}

impl AsFd for HotplugMonitor {
    fn as_fd(&self) -> BorrowedFd<'_> {
        // The descriptor lives as long as the monitor socket
        unsafe { BorrowedFd::borrow_raw(self.socket.as_raw_fd()) }
    }
}
