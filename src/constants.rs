//! Global constants for evlircd
//!
//! Consolidates timing defaults, protocol limits, and exit statuses
//! to eliminate magic numbers throughout the codebase.

use std::time::Duration;

// ============================================================================
// Timing Constants
// ============================================================================

/// Interval between attempts to reopen closed devices
pub const RESCAN_INTERVAL: Duration = Duration::from_secs(30);

/// Extra time added on top of the rescan interval when nothing else is due
pub const MAX_WAIT_SLACK: Duration = Duration::from_secs(2);

/// Slack added to every computed wait so a deadline is never polled early
pub const DEADLINE_SLACK: Duration = Duration::from_millis(1);

/// Default software autorepeat initial delay in milliseconds
pub const DEFAULT_AUTOREPEAT_DELAY_MS: u64 = 250;

/// Default software autorepeat period in milliseconds
pub const DEFAULT_AUTOREPEAT_PERIOD_MS: u64 = 33;

// ============================================================================
// Decoder Defaults
// ============================================================================

/// Lowest key code reported by default (KEY_F12). Keeps regular keyboard
/// keys and mouse buttons below the remote-control range out of the stream.
pub const DEFAULT_KEY_MIN: u16 = 88;

/// Default repeat-coalescing window in milliseconds (0 = never coalesce)
pub const DEFAULT_REPEAT_WINDOW_MS: u64 = 0;

// ============================================================================
// Paths and Identity
// ============================================================================

/// Default listening socket, where LIRC clients expect lircd
pub const DEFAULT_SOCKET_PATH: &str = "/run/lirc/lircd";

/// Directory scanned for event device nodes
pub const DEFAULT_INPUT_DIR: &str = "/dev/input";

/// File name prefix of event device nodes inside the input directory
pub const EVENT_NODE_PREFIX: &str = "event";

/// Identity the daemon switches to after binding its socket
pub const DEFAULT_RUN_AS_USER: &str = "nobody";

/// Maximum length of a device name returned by EVIOCGNAME
pub const DEVICE_NAME_LEN: usize = 256;

/// Number of input_event records drained per read
pub const EVENT_READ_BATCH: usize = 64;

// ============================================================================
// Exit Statuses (sysexits.h)
// ============================================================================

/// Command line usage error
pub const EX_USAGE: u8 = 64;

/// Operating system error
pub const EX_OSERR: u8 = 71;
