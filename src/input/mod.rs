//! Input handling
//!
//! Everything between an evdev node and a key report:
//! - Device access and capability checks (evdev ioctls)
//! - Per-device decoding, modifier capture and software autorepeat
//! - The device registry with rescan and hotplug support
//! - Key code names and user overrides

pub mod autorepeat;
pub mod decoder;
pub mod device;
pub mod hotplug;
pub mod ioctl;
pub mod keycodes;
pub mod keynames;
pub mod registry;

#[cfg(test)]
pub mod testing;

pub use autorepeat::AutorepeatTiming;
pub use decoder::DecoderSettings;
pub use device::{DeviceOpener, EvdevOpener};
pub use hotplug::HotplugMonitor;
pub use keynames::KeyNameTable;
pub use registry::{DeviceRegistry, DeviceSelector, RegistryOptions};
