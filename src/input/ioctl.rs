//! evdev ioctl wrappers
//!
//! Safe wrappers around the handful of EVIOC* requests the registry
//! issues when opening a device, to keep the unsafe calls in one place.

use anyhow::{anyhow, Result};
use std::os::unix::io::RawFd;

use crate::constants::DEVICE_NAME_LEN;

/// EVIOCGBIT(ev, len): supported event codes of type `ev` (0 = event types)
const fn eviocgbit(ev: u32, len: usize) -> libc::c_ulong {
    nix::request_code_read!(b'E', 0x20 + ev, len) as libc::c_ulong
}

/// EVIOCGNAME(len): device display name
const fn eviocgname(len: usize) -> libc::c_ulong {
    nix::request_code_read!(b'E', 0x06, len) as libc::c_ulong
}

/// EVIOCGREP: hardware autorepeat delay/period
const EVIOCGREP: libc::c_ulong =
    nix::request_code_read!(b'E', 0x03, std::mem::size_of::<[libc::c_uint; 2]>()) as libc::c_ulong;

/// EVIOCGRAB: exclusive access on/off
const EVIOCGRAB: libc::c_ulong =
    nix::request_code_write!(b'E', 0x90, std::mem::size_of::<libc::c_int>()) as libc::c_ulong;

/// Execute an ioctl command with a mutable argument.
///
/// The caller must ensure the argument type matches what the request expects.
fn ioctl_with_mut_arg<T>(fd: RawFd, cmd: libc::c_ulong, arg: &mut T, cmd_name: &str) -> Result<()> {
    let ret = unsafe { libc::ioctl(fd, cmd, arg as *mut T) };
    if ret < 0 {
        Err(anyhow!(
            "{} failed on fd {}: {}",
            cmd_name,
            fd,
            std::io::Error::last_os_error()
        ))
    } else {
        Ok(())
    }
}

/// Bitmask of supported event types (bit n = event type n)
pub fn event_type_bits(fd: RawFd) -> Result<libc::c_ulong> {
    let mut bits: libc::c_ulong = 0;
    ioctl_with_mut_arg(
        fd,
        eviocgbit(0, std::mem::size_of::<libc::c_ulong>()),
        &mut bits,
        "EVIOCGBIT",
    )?;
    Ok(bits)
}

/// Device display name as reported by the driver
pub fn device_name(fd: RawFd) -> Result<String> {
    let mut buf = [0u8; DEVICE_NAME_LEN];
    ioctl_with_mut_arg(fd, eviocgname(DEVICE_NAME_LEN), &mut buf, "EVIOCGNAME")?;
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..len]).into_owned())
}

/// Hardware autorepeat settings; fails on devices without hardware repeat
pub fn repeat_settings(fd: RawFd) -> Result<[libc::c_uint; 2]> {
    let mut rep: [libc::c_uint; 2] = [0; 2];
    ioctl_with_mut_arg(fd, EVIOCGREP, &mut rep, "EVIOCGREP")?;
    Ok(rep)
}

/// Request exclusive delivery of this device's events
pub fn grab(fd: RawFd) -> Result<()> {
    let ret = unsafe { libc::ioctl(fd, EVIOCGRAB, 1 as libc::c_int) };
    if ret < 0 {
        Err(anyhow!(
            "EVIOCGRAB failed on fd {}: {}",
            fd,
            std::io::Error::last_os_error()
        ))
    } else {
        Ok(())
    }
}
