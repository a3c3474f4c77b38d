//! Event loop
//!
//! One thread waits on every open device, the listening socket and the
//! optional hotplug monitor at once. Each wake-up services whatever is
//! ready, fires due autorepeat timers and, when due, rescans for devices
//! that went away.

use log::{debug, error, info, warn};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags};
use std::time::{Duration, Instant};

use crate::constants::{DEADLINE_SLACK, MAX_WAIT_SLACK};
use crate::daemon;
use crate::error::DaemonError;
use crate::input::{DeviceOpener, DeviceRegistry, HotplugMonitor, KeyNameTable};
use crate::protocol::format_line;
use crate::server::{ClientHub, ListenSocket};

/// What a wait reported as ready
#[derive(Debug, Default)]
struct Readiness {
    /// Registry indices of devices with pending input or a hangup
    devices: Vec<usize>,
    listener: bool,
    hotplug: bool,
    /// The wait itself failed
    failed: bool,
}

pub struct Scheduler<O: DeviceOpener> {
    registry: DeviceRegistry<O>,
    hub: ClientHub,
    listener: ListenSocket,
    names: KeyNameTable,
    /// Reported instead of each device's own name
    source_name: Option<String>,
    hotplug: Option<HotplugMonitor>,
    rescan_interval: Duration,
    next_rescan: Instant,
}

impl<O: DeviceOpener> Scheduler<O> {
    pub fn new(
        registry: DeviceRegistry<O>,
        listener: ListenSocket,
        names: KeyNameTable,
        source_name: Option<String>,
        rescan_interval: Duration,
    ) -> Self {
        Self {
            registry,
            hub: ClientHub::new(),
            listener,
            names,
            source_name,
            hotplug: None,
            rescan_interval,
            next_rescan: Instant::now() + rescan_interval,
        }
    }

    /// Also wake up when udev announces new input devices
    pub fn with_hotplug(mut self, monitor: Option<HotplugMonitor>) -> Self {
        self.hotplug = monitor;
        self
    }

    #[cfg(test)]
    pub fn registry(&self) -> &DeviceRegistry<O> {
        &self.registry
    }

    #[cfg(test)]
    pub fn clients(&self) -> usize {
        self.hub.len()
    }

    /// Run until a shutdown signal arrives or the listener breaks
    pub fn run(&mut self) -> Result<(), DaemonError> {
        info!(
            "Serving {} device(s) on {}",
            self.registry.open_count(),
            self.listener.path().display()
        );
        while !daemon::shutdown_requested() {
            self.run_once()?;
        }
        info!("Shutdown requested");
        Ok(())
    }

    /// One wait and everything it made ready
    pub fn run_once(&mut self) -> Result<(), DaemonError> {
        let timeout = self.wait_timeout(Instant::now());
        let ready = self.wait(timeout);
        let now = Instant::now();

        if ready.failed {
            self.rescan(now);
            return Ok(());
        }

        for index in ready.devices {
            self.service_device(index, now);
        }

        if ready.listener {
            self.hub.accept_pending(&self.listener)?;
        }

        let mut plugged = false;
        if ready.hotplug {
            if let Some(monitor) = self.hotplug.as_mut() {
                plugged = monitor.poll();
            }
        }

        self.fire_autorepeat(now);

        if plugged || now >= self.next_rescan {
            self.rescan(now);
        }
        Ok(())
    }

    /// How long the next wait may block: until the earliest of the next
    /// rescan and any autorepeat deadline, plus a little slack so the
    /// deadline has passed on wake-up. Never longer than one rescan
    /// interval plus the maximum slack.
    pub fn wait_timeout(&self, now: Instant) -> Duration {
        let until_rescan = self.next_rescan.saturating_duration_since(now);
        let wait = match self.registry.next_autorepeat_in(now) {
            Some(autorepeat) => autorepeat.min(until_rescan),
            None => until_rescan,
        };
        (wait + DEADLINE_SLACK).min(self.rescan_interval + MAX_WAIT_SLACK)
    }

    fn wait(&self, timeout: Duration) -> Readiness {
        let mut slots = Vec::new();
        let mut fds = Vec::new();
        for (index, device) in self.registry.devices().iter().enumerate() {
            if let Some(handle) = device.handle() {
                fds.push(PollFd::new(handle, PollFlags::POLLIN));
                slots.push(index);
            }
        }
        let listener_slot = fds.len();
        fds.push(PollFd::new(&self.listener, PollFlags::POLLIN));
        let hotplug_slot = self.hotplug.as_ref().map(|monitor| {
            fds.push(PollFd::new(monitor, PollFlags::POLLIN));
            fds.len() - 1
        });

        match poll(&mut fds, poll_timeout_ms(timeout)) {
            Ok(_) => {}
            Err(Errno::EINTR) => return Readiness::default(),
            Err(e) => {
                error!("Error while waiting for events: {}", e);
                return Readiness {
                    failed: true,
                    ..Readiness::default()
                };
            }
        }

        let is_ready = |fd: &PollFd| fd.revents().map_or(false, |r| !r.is_empty());
        Readiness {
            devices: slots
                .iter()
                .zip(&fds)
                .filter(|(_, fd)| is_ready(fd))
                .map(|(&index, _)| index)
                .collect(),
            listener: is_ready(&fds[listener_slot]),
            hotplug: hotplug_slot.map_or(false, |slot| is_ready(&fds[slot])),
            failed: false,
        }
    }

    /// Decode everything a device has pending and broadcast the results.
    /// A failed read closes the device until the next rescan.
    fn service_device(&mut self, index: usize, now: Instant) {
        let Some(device) = self.registry.device_mut(index) else {
            return;
        };

        let events = match device.read_events() {
            Ok(events) => events,
            Err(e) => {
                warn!("Error reading {}: {}", device.path().display(), e);
                self.registry.close(index);
                return;
            }
        };

        let mut lines = Vec::new();
        for event in &events {
            if let Some(report) = device.decoder_mut().decode(event, now) {
                let source = self.source_name.as_deref().unwrap_or(device.name());
                lines.push(format_line(&report, &self.names, source));
            }
        }

        for line in lines {
            debug!("{}", line.trim_end());
            self.hub.broadcast(line.as_bytes());
        }
    }

    /// Emit a synthetic press for every open device whose timer is due
    fn fire_autorepeat(&mut self, now: Instant) {
        let mut lines = Vec::new();
        for index in 0..self.registry.devices().len() {
            let Some(device) = self.registry.device_mut(index) else {
                continue;
            };
            if !device.is_open() {
                continue;
            }
            if let Some(report) = device.decoder_mut().poll_autorepeat(now) {
                let source = self.source_name.as_deref().unwrap_or(device.name());
                lines.push(format_line(&report, &self.names, source));
            }
        }

        for line in lines {
            self.hub.broadcast(line.as_bytes());
        }
    }

    fn rescan(&mut self, now: Instant) {
        if self.registry.needs_rescan() {
            let reopened = self.registry.rescan();
            if reopened > 0 {
                info!("{} device(s) back online", reopened);
            }
        }
        self.next_rescan = now + self.rescan_interval;
    }
}

/// Milliseconds for poll(), rounded up so a wait never ends before its
/// deadline
fn poll_timeout_ms(timeout: Duration) -> i32 {
    let ms = (timeout.as_nanos() + 999_999) / 1_000_000;
    ms.min(i32::MAX as u128) as i32
}
