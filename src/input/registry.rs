//! Device registry
//!
//! Owns every device the daemon has opened, open or waiting to be
//! reopened. A device that fails a read is closed but keeps its record;
//! `rescan()` later reopens it in place. Name patterns are remembered so
//! a rescan can also pick up matching devices that appear later.
//!
//! A record found through a name pattern belongs to whatever device
//! carries a matching name at that node. Once the node is gone or holds
//! a device with another name, the record is dropped instead of retried.

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use log::{debug, error, info, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::autorepeat::AutorepeatTiming;
use super::decoder::{DecoderSettings, DeviceDecoder};
use super::device::{DeviceOpener, EventSource, OpenedDevice, RawEvent};

/// Case-insensitive, `*` crosses `/` (fnmatch without FNM_PATHNAME)
const NAME_MATCH: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// How a device is selected on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Explicit device node
    Path(PathBuf),
    /// Glob over the device's reported display name
    Named(String),
}

/// Options applied to every device the registry opens
#[derive(Debug, Clone, Copy)]
pub struct RegistryOptions {
    /// Request exclusive delivery from the kernel
    pub grab: bool,
    pub decoder: DecoderSettings,
    /// Software autorepeat timing, `None` when autorepeat is disabled
    pub autorepeat: Option<AutorepeatTiming>,
}

/// Open handle or waiting for a rescan
pub enum DeviceState<H> {
    Open(H),
    Closed,
}

/// One registered device
pub struct Device<H> {
    path: PathBuf,
    name: String,
    state: DeviceState<H>,
    decoder: DeviceDecoder,
    /// Pattern the device was adopted through, `None` for explicit paths
    pattern: Option<Pattern>,
}

impl<H: EventSource> Device<H> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name announced to clients
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, DeviceState::Open(_))
    }

    pub fn handle(&self) -> Option<&H> {
        match &self.state {
            DeviceState::Open(handle) => Some(handle),
            DeviceState::Closed => None,
        }
    }

    #[cfg(test)]
    pub fn decoder(&self) -> &DeviceDecoder {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut DeviceDecoder {
        &mut self.decoder
    }

    /// Drain pending events. A closed device reads as an error.
    pub fn read_events(&mut self) -> io::Result<Vec<RawEvent>> {
        match &mut self.state {
            DeviceState::Open(handle) => handle.read_events(),
            DeviceState::Closed => Err(io::Error::new(io::ErrorKind::NotConnected, "device closed")),
        }
    }
}

/// Registry of devices, indexed by position. Positions only shift
/// during `rescan()`.
pub struct DeviceRegistry<O: DeviceOpener> {
    opener: O,
    options: RegistryOptions,
    devices: Vec<Device<O::Handle>>,
    patterns: Vec<Pattern>,
}

impl<O: DeviceOpener> DeviceRegistry<O> {
    pub fn new(opener: O, options: RegistryOptions) -> Self {
        Self {
            opener,
            options,
            devices: Vec::new(),
            patterns: Vec::new(),
        }
    }

    /// Open every device `selector` names, returning how many were added
    pub fn add(&mut self, selector: &DeviceSelector) -> Result<usize> {
        match selector {
            DeviceSelector::Path(path) => Ok(usize::from(self.add_path(path))),
            DeviceSelector::Named(pattern) => self.add_named(pattern),
        }
    }

    /// Open a device by path. Failures are logged and skipped.
    pub fn add_path(&mut self, path: &Path) -> bool {
        self.register(path, None)
    }

    fn register(&mut self, path: &Path, pattern: Option<Pattern>) -> bool {
        if self.is_known(path) {
            debug!("{} already registered", path.display());
            return false;
        }
        let Some(opened) = self.try_open(path) else {
            return false;
        };

        let autorepeat = self.options.autorepeat.filter(|_| !opened.hardware_repeat);
        if autorepeat.is_some() {
            info!("{}: using software autorepeat", path.display());
        }

        self.devices.push(Device {
            path: path.to_path_buf(),
            name: path.display().to_string(),
            state: DeviceState::Open(opened.handle),
            decoder: DeviceDecoder::new(self.options.decoder, autorepeat),
            pattern,
        });
        info!("Reading device: {}", path.display());
        true
    }

    /// Open every device whose reported name matches `pattern`
    pub fn add_named(&mut self, pattern: &str) -> Result<usize> {
        let pattern = Pattern::new(pattern)
            .with_context(|| format!("Invalid device name pattern {:?}", pattern))?;
        let candidates = self.opener.scan();
        let added = self.adopt_matching(std::slice::from_ref(&pattern), &candidates);
        if added == 0 {
            warn!("No event device name matches {:?}", pattern.as_str());
        }
        self.patterns.push(pattern);
        Ok(added)
    }

    /// Drop pattern records whose device is gone, reopen closed devices,
    /// then adopt new devices matching a remembered name pattern.
    /// Returns how many devices came (back) online.
    pub fn rescan(&mut self) -> usize {
        let candidates = if self.patterns.is_empty() {
            Vec::new()
        } else {
            self.opener.scan()
        };
        self.forget_vanished(&candidates);

        let mut reopened = 0;
        for index in 0..self.devices.len() {
            if self.devices[index].is_open() {
                continue;
            }
            let path = self.devices[index].path.clone();
            info!("Reading device: {}", path.display());
            if let Some(opened) = self.try_open(&path) {
                self.devices[index].state = DeviceState::Open(opened.handle);
                info!("Reopened {}", path.display());
                reopened += 1;
            }
        }

        if !self.patterns.is_empty() {
            let patterns = std::mem::take(&mut self.patterns);
            reopened += self.adopt_matching(&patterns, &candidates);
            self.patterns = patterns;
        }
        reopened
    }

    /// Remove closed pattern records whose node no longer carries a
    /// matching device name
    fn forget_vanished(&mut self, candidates: &[(PathBuf, String)]) {
        self.devices.retain(|device| {
            let Some(pattern) = &device.pattern else {
                return true;
            };
            if device.is_open() {
                return true;
            }
            let present = candidates
                .iter()
                .any(|(path, name)| *path == device.path && pattern.matches_with(name, NAME_MATCH));
            if !present {
                info!(
                    "{} no longer matches {:?}, forgetting it",
                    device.path.display(),
                    pattern.as_str()
                );
            }
            present
        });
    }

    /// Mark a device closed after a read failure. The handle is dropped
    /// and held keys are forgotten since their releases will never arrive.
    pub fn close(&mut self, index: usize) {
        if let Some(device) = self.devices.get_mut(index) {
            if device.is_open() {
                device.state = DeviceState::Closed;
                device.decoder.reset_held_state();
                warn!("{} closed, waiting for rescan", device.path.display());
            }
        }
    }

    pub fn devices(&self) -> &[Device<O::Handle>] {
        &self.devices
    }

    pub fn device_mut(&mut self, index: usize) -> Option<&mut Device<O::Handle>> {
        self.devices.get_mut(index)
    }

    pub fn open_count(&self) -> usize {
        self.devices.iter().filter(|d| d.is_open()).count()
    }

    /// Whether a rescan has anything to do
    pub fn needs_rescan(&self) -> bool {
        !self.patterns.is_empty() || self.devices.iter().any(|d| !d.is_open())
    }

    /// Shortest time until a software autorepeat fires on an open device
    pub fn next_autorepeat_in(&self, now: Instant) -> Option<Duration> {
        self.devices
            .iter()
            .filter(|d| d.is_open())
            .filter_map(|d| d.decoder.autorepeat_time_left(now))
            .min()
    }

    fn is_known(&self, path: &Path) -> bool {
        self.devices.iter().any(|d| d.path == path)
    }

    fn try_open(&self, path: &Path) -> Option<OpenedDevice<O::Handle>> {
        match self.opener.open(path, self.options.grab) {
            Ok(opened) => Some(opened),
            Err(e) => {
                error!("{:#}", e);
                None
            }
        }
    }

    fn adopt_matching(&mut self, patterns: &[Pattern], candidates: &[(PathBuf, String)]) -> usize {
        let mut added = 0;
        for (path, name) in candidates {
            if self.is_known(path) {
                continue;
            }
            if let Some(pattern) = patterns.iter().find(|p| p.matches_with(name, NAME_MATCH)) {
                debug!("{} ({}) matches", path.display(), name);
                if self.register(path, Some(pattern.clone())) {
                    added += 1;
                }
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keycodes::KEY_MAX;
    use crate::input::testing::MockOpener;

    fn options(autorepeat: bool) -> RegistryOptions {
        RegistryOptions {
            grab: true,
            decoder: DecoderSettings {
                key_min: 88,
                key_max: KEY_MAX,
                capture_modifiers: false,
                repeat_window: Duration::ZERO,
            },
            autorepeat: autorepeat.then_some(AutorepeatTiming {
                delay: Duration::from_millis(250),
                period: Duration::from_millis(33),
            }),
        }
    }

    #[test]
    fn test_add_path_skips_failures() {
        let opener = MockOpener::default();
        opener.plug("/dev/input/event0", "Remote");
        let mut registry = DeviceRegistry::new(opener, options(false));

        assert!(registry.add_path(Path::new("/dev/input/event0")));
        assert!(!registry.add_path(Path::new("/dev/input/event9")));
        // Duplicates are ignored
        assert!(!registry.add_path(Path::new("/dev/input/event0")));
        assert_eq!(registry.devices().len(), 1);
        assert_eq!(registry.devices()[0].name(), "/dev/input/event0");
    }

    #[test]
    fn test_add_named_matches_case_insensitively() {
        let opener = MockOpener::default();
        opener.plug("/dev/input/event0", "AT Translated Set 2 keyboard");
        opener.plug("/dev/input/event1", "MCE IR Remote");
        opener.plug("/dev/input/event2", "Logitech USB Receiver");
        let mut registry = DeviceRegistry::new(opener, options(false));

        let added = registry.add(&DeviceSelector::Named("*ir remote*".into())).unwrap();
        assert_eq!(added, 1);
        assert_eq!(registry.devices()[0].path(), Path::new("/dev/input/event1"));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let mut registry = DeviceRegistry::new(MockOpener::default(), options(false));
        assert!(registry.add(&DeviceSelector::Named("[".into())).is_err());
    }

    #[test]
    fn test_software_autorepeat_only_without_hardware_repeat() {
        let opener = MockOpener::default();
        opener.plug("/dev/input/event0", "Remote");
        opener.plug_with_hardware_repeat("/dev/input/event1", "Keyboard");
        let mut registry = DeviceRegistry::new(opener, options(true));
        registry.add_path(Path::new("/dev/input/event0"));
        registry.add_path(Path::new("/dev/input/event1"));

        assert!(registry.devices()[0].decoder().software_autorepeat());
        assert!(!registry.devices()[1].decoder().software_autorepeat());
    }

    #[test]
    fn test_close_then_rescan_reuses_record() {
        let opener = MockOpener::default();
        opener.plug("/dev/input/event0", "Remote");
        let mut registry = DeviceRegistry::new(opener.clone(), options(false));
        registry.add_path(Path::new("/dev/input/event0"));

        opener.unplug("/dev/input/event0");
        assert!(registry.device_mut(0).unwrap().read_events().is_err());
        registry.close(0);
        assert_eq!(registry.open_count(), 0);
        assert!(registry.needs_rescan());

        // Still unplugged: nothing to reopen
        assert_eq!(registry.rescan(), 0);

        opener.plug("/dev/input/event0", "Remote");
        assert_eq!(registry.rescan(), 1);
        assert_eq!(registry.devices().len(), 1);
        assert!(registry.devices()[0].is_open());
        assert!(!registry.needs_rescan());
    }

    #[test]
    fn test_rescan_adopts_new_pattern_matches() {
        let opener = MockOpener::default();
        opener.plug("/dev/input/event1", "MCE IR Remote");
        let mut registry = DeviceRegistry::new(opener.clone(), options(false));
        registry.add_named("*remote*").unwrap();

        opener.plug("/dev/input/event4", "Second IR Remote");
        opener.plug("/dev/input/event5", "Mouse");
        assert_eq!(registry.rescan(), 1);
        assert_eq!(registry.devices().len(), 2);
        assert_eq!(registry.devices()[1].path(), Path::new("/dev/input/event4"));
    }

    #[test]
    fn test_closed_device_drops_autorepeat_deadline() {
        let opener = MockOpener::default();
        opener.plug("/dev/input/event0", "Remote");
        let mut registry = DeviceRegistry::new(opener, options(true));
        registry.add_path(Path::new("/dev/input/event0"));

        let now = Instant::now();
        let device = registry.device_mut(0).unwrap();
        device.decoder_mut().decode(&RawEvent::key(0x160, 1), now);
        assert_eq!(
            registry.next_autorepeat_in(now),
            Some(Duration::from_millis(250))
        );

        registry.close(0);
        assert_eq!(registry.next_autorepeat_in(now), None);
    }

    #[test]
    fn test_grab_failure_skips_only_that_device() {
        let opener = MockOpener::default();
        opener.plug("/dev/input/event0", "MCE IR Remote");
        opener.plug_refusing_grab("/dev/input/event1", "Grabbed IR Remote");
        opener.plug("/dev/input/event2", "Second IR Remote");
        let mut registry = DeviceRegistry::new(opener, options(false));

        assert_eq!(registry.add_named("*remote*").unwrap(), 2);
        let paths: Vec<&Path> = registry.devices().iter().map(|d| d.path()).collect();
        assert_eq!(
            paths,
            vec![Path::new("/dev/input/event0"), Path::new("/dev/input/event2")]
        );
    }

    #[test]
    fn test_replug_at_new_node_replaces_record() {
        let opener = MockOpener::default();
        opener.plug("/dev/input/event3", "MCE IR Remote");
        let mut registry = DeviceRegistry::new(opener.clone(), options(false));
        registry.add_named("*remote*").unwrap();

        for n in 4..10 {
            let old = format!("/dev/input/event{}", n - 1);
            let new = format!("/dev/input/event{}", n);
            opener.unplug(&old);
            assert!(registry.device_mut(0).unwrap().read_events().is_err());
            registry.close(0);
            opener.plug(&new, "MCE IR Remote");

            assert_eq!(registry.rescan(), 1);
            assert_eq!(registry.devices().len(), 1);
            assert_eq!(registry.devices()[0].path(), Path::new(&new));
            assert!(registry.devices()[0].is_open());
        }
    }

    #[test]
    fn test_reused_node_with_other_name_is_not_reopened() {
        let opener = MockOpener::default();
        opener.plug("/dev/input/event3", "MCE IR Remote");
        let mut registry = DeviceRegistry::new(opener.clone(), options(false));
        registry.add_named("*remote*").unwrap();
        let opens = opener.opens();

        opener.unplug("/dev/input/event3");
        registry.close(0);
        opener.plug("/dev/input/event3", "AT Translated Set 2 keyboard");

        assert_eq!(registry.rescan(), 0);
        assert!(registry.devices().is_empty());
        assert_eq!(opener.opens(), opens);
    }

    #[test]
    fn test_explicit_path_record_is_kept_while_missing() {
        let opener = MockOpener::default();
        opener.plug("/dev/input/event0", "Remote");
        let mut registry = DeviceRegistry::new(opener.clone(), options(false));
        registry.add_path(Path::new("/dev/input/event0"));
        registry.add_named("*nothing here*").unwrap();

        opener.unplug("/dev/input/event0");
        registry.close(0);
        assert_eq!(registry.rescan(), 0);
        assert_eq!(registry.devices().len(), 1);
        assert!(!registry.devices()[0].is_open());
    }
}
