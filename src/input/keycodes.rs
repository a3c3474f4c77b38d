//! evdev keycode constants
//!
//! The subset of <linux/input-event-codes.h> the decoder needs,
//! plus the held-modifier set carried on every reported key.

use bitflags::bitflags;

// ============================================================================
// Event Types
// ============================================================================

/// Key and button state changes
pub const EV_KEY: u16 = 0x01;

/// Highest key code the kernel defines
pub const KEY_MAX: u16 = 0x2ff;

/// Number of key codes (table size)
pub const KEY_CNT: usize = KEY_MAX as usize + 1;

// ============================================================================
// Key Values
// ============================================================================

/// Key released
pub const KEY_RELEASE: i32 = 0;

/// Key pressed
pub const KEY_PRESS: i32 = 1;

// ============================================================================
// Modifier Keys
// ============================================================================

/// Left Control key
pub const KEY_LEFTCTRL: u16 = 29;

/// Right Control key
pub const KEY_RIGHTCTRL: u16 = 97;

/// Left Shift key
pub const KEY_LEFTSHIFT: u16 = 42;

/// Right Shift key
pub const KEY_RIGHTSHIFT: u16 = 54;

/// Left Alt key
pub const KEY_LEFTALT: u16 = 56;

/// Right Alt key (AltGr on some keyboards)
pub const KEY_RIGHTALT: u16 = 100;

/// Left Meta (Super/Windows) key
pub const KEY_LEFTMETA: u16 = 125;

/// Right Meta (Super/Windows) key
pub const KEY_RIGHTMETA: u16 = 126;

bitflags! {
    /// Modifier keys currently held on one device
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        const CTRL = 0b0001;
        const SHIFT = 0b0010;
        const ALT = 0b0100;
        const META = 0b1000;
    }
}

impl Modifiers {
    /// Protocol prefixes in wire order
    pub const PREFIXES: [(Modifiers, &'static str); 4] = [
        (Modifiers::CTRL, "CTRL_"),
        (Modifiers::SHIFT, "SHIFT_"),
        (Modifiers::ALT, "ALT_"),
        (Modifiers::META, "META_"),
    ];
}

/// Map a keycode to the modifier it controls, left or right variant
#[inline]
pub const fn modifier_for(keycode: u16) -> Option<Modifiers> {
    match keycode {
        KEY_LEFTCTRL | KEY_RIGHTCTRL => Some(Modifiers::CTRL),
        KEY_LEFTSHIFT | KEY_RIGHTSHIFT => Some(Modifiers::SHIFT),
        KEY_LEFTALT | KEY_RIGHTALT => Some(Modifiers::ALT),
        KEY_LEFTMETA | KEY_RIGHTMETA => Some(Modifiers::META),
        _ => None,
    }
}
