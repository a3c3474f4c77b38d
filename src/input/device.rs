//! Event device access
//!
//! Opens /dev/input/eventN nodes, checks their capabilities and drains
//! raw `input_event` records from them. The registry only sees devices
//! through [`DeviceOpener`] and [`EventSource`], so it can be driven
//! without real hardware.

use anyhow::{anyhow, Context, Result};
use log::debug;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd};
use std::path::{Path, PathBuf};

use super::ioctl;
use super::keycodes::EV_KEY;
use crate::constants::{EVENT_NODE_PREFIX, EVENT_READ_BATCH};

/// One raw record read from an event device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// Event type (EV_KEY, EV_SYN, ...)
    pub kind: u16,
    /// Key code for EV_KEY events
    pub code: u16,
    /// 0 = release, 1 = press, 2 = hardware autorepeat
    pub value: i32,
}

#[cfg(test)]
impl RawEvent {
    pub fn key(code: u16, value: i32) -> Self {
        Self {
            kind: EV_KEY,
            code,
            value,
        }
    }
}

impl From<&libc::input_event> for RawEvent {
    fn from(ev: &libc::input_event) -> Self {
        Self {
            kind: ev.type_,
            code: ev.code,
            value: ev.value,
        }
    }
}

/// A readable device handle the scheduler can wait on
pub trait EventSource: AsFd {
    /// Drain pending records.
    ///
    /// Returns an empty list when nothing is pending. Any error means the
    /// device is gone and must be closed.
    fn read_events(&mut self) -> io::Result<Vec<RawEvent>>;
}

/// Result of successfully opening a device
pub struct OpenedDevice<H> {
    pub handle: H,
    /// Device repeats keys itself; software autorepeat stays off
    pub hardware_repeat: bool,
}

/// Opens devices and lists candidates for name matching
pub trait DeviceOpener {
    type Handle: EventSource;

    /// Open one device, optionally grabbing it exclusively
    fn open(&self, path: &Path, grab: bool) -> Result<OpenedDevice<Self::Handle>>;

    /// Every candidate node with its reported display name
    fn scan(&self) -> Vec<(PathBuf, String)>;
}

/// An open evdev node
pub struct EventDevice {
    file: File,
}

impl EventDevice {
    /// Open `path` non-blocking and verify it reports key events
    pub fn open(path: &Path, grab: bool) -> Result<Self> {
        let file = open_nonblocking(path)?;
        let fd = file.as_raw_fd();

        let bits = ioctl::event_type_bits(fd)
            .with_context(|| format!("Could not read supported event types from {}", path.display()))?;
        debug!("{}: event types {:#x}", path.display(), bits);

        if bits & (1 << EV_KEY) == 0 {
            return Err(anyhow!("{} does not support EV_KEY events", path.display()));
        }

        if grab {
            ioctl::grab(fd).with_context(|| format!("Failed to grab {}", path.display()))?;
        }

        Ok(Self { file })
    }

    /// Whether the driver repeats held keys itself
    pub fn has_hardware_repeat(&self) -> bool {
        ioctl::repeat_settings(self.file.as_raw_fd()).is_ok()
    }
}

impl AsFd for EventDevice {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl EventSource for EventDevice {
    fn read_events(&mut self) -> io::Result<Vec<RawEvent>> {
        let mut records: [libc::input_event; EVENT_READ_BATCH] = unsafe { std::mem::zeroed() };
        let record_size = std::mem::size_of::<libc::input_event>();
        let bytes = unsafe {
            std::slice::from_raw_parts_mut(
                records.as_mut_ptr() as *mut u8,
                record_size * EVENT_READ_BATCH,
            )
        };

        match nix::unistd::read(self.file.as_raw_fd(), bytes) {
            Ok(0) => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "device closed")),
            Ok(n) if n % record_size != 0 => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("short read of {} bytes", n),
            )),
            Ok(n) => Ok(records[..n / record_size].iter().map(RawEvent::from).collect()),
            Err(nix::errno::Errno::EAGAIN) => Ok(Vec::new()),
            Err(e) => Err(io::Error::from(e)),
        }
    }
}

/// Opens real evdev nodes below an input directory
pub struct EvdevOpener {
    input_dir: PathBuf,
}

impl EvdevOpener {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
        }
    }
}

impl DeviceOpener for EvdevOpener {
    type Handle = EventDevice;

    fn open(&self, path: &Path, grab: bool) -> Result<OpenedDevice<EventDevice>> {
        let device = EventDevice::open(path, grab)?;
        let hardware_repeat = device.has_hardware_repeat();
        Ok(OpenedDevice {
            handle: device,
            hardware_repeat,
        })
    }

    fn scan(&self) -> Vec<(PathBuf, String)> {
        let entries = match std::fs::read_dir(&self.input_dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Cannot scan {}: {}", self.input_dir.display(), e);
                return Vec::new();
            }
        };

        let mut nodes: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with(EVENT_NODE_PREFIX))
            })
            .collect();
        nodes.sort();

        nodes
            .into_iter()
            .filter_map(|path| match read_device_name(&path) {
                Ok(name) => Some((path, name)),
                Err(e) => {
                    debug!("Skipping {}: {:#}", path.display(), e);
                    None
                }
            })
            .collect()
    }
}

/// Display name of the device at `path`, without keeping it open
pub fn read_device_name(path: &Path) -> Result<String> {
    let file = open_nonblocking(path)?;
    ioctl::device_name(file.as_raw_fd())
        .with_context(|| format!("Could not read name of event device {}", path.display()))
}

fn open_nonblocking(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .with_context(|| format!("Could not open {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_event_from_input_event() {
        let mut ev: libc::input_event = unsafe { std::mem::zeroed() };
        ev.type_ = EV_KEY;
        ev.code = 0x160;
        ev.value = 1;
        assert_eq!(RawEvent::from(&ev), RawEvent::key(0x160, 1));
    }

    #[test]
    fn test_open_rejects_missing_node() {
        let dir = tempfile::tempdir().unwrap();
        let err = EventDevice::open(&dir.path().join("event0"), false)
            .err()
            .expect("missing node must not open");
        assert!(format!("{:#}", err).contains("Could not open"));
    }

    #[test]
    fn test_open_rejects_non_evdev_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event0");
        std::fs::write(&path, b"not a device").unwrap();
        // The EVIOCGBIT ioctl fails on a regular file
        assert!(EventDevice::open(&path, false).is_err());
    }

    #[test]
    fn test_scan_skips_unreadable_nodes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("event3"), b"").unwrap();
        std::fs::write(dir.path().join("mice"), b"").unwrap();
        let opener = EvdevOpener::new(dir.path());
        assert!(opener.scan().is_empty());
    }
}
