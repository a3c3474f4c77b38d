//! Key code to symbolic name table
//!
//! Built from the Linux `KEY_*`/`BTN_*` names and optionally patched
//! from an override file of `<code-or-name> = <new-name>` lines.
//! The table is filled once at startup and only read afterwards.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::borrow::Cow;
use std::path::Path;

use super::keycodes::{KEY_CNT, KEY_MAX};

/// Names with a code of their own in <linux/input-event-codes.h>.
/// Numbered runs (F13-F24, FN_F1-FN_F12, ...) are generated in `builtin()`.
const BUILTIN_NAMES: &[(u16, &str)] = &[
    (0, "KEY_RESERVED"),
    (1, "KEY_ESC"),
    (2, "KEY_1"),
    (3, "KEY_2"),
    (4, "KEY_3"),
    (5, "KEY_4"),
    (6, "KEY_5"),
    (7, "KEY_6"),
    (8, "KEY_7"),
    (9, "KEY_8"),
    (10, "KEY_9"),
    (11, "KEY_0"),
    (12, "KEY_MINUS"),
    (13, "KEY_EQUAL"),
    (14, "KEY_BACKSPACE"),
    (15, "KEY_TAB"),
    (16, "KEY_Q"),
    (17, "KEY_W"),
    (18, "KEY_E"),
    (19, "KEY_R"),
    (20, "KEY_T"),
    (21, "KEY_Y"),
    (22, "KEY_U"),
    (23, "KEY_I"),
    (24, "KEY_O"),
    (25, "KEY_P"),
    (26, "KEY_LEFTBRACE"),
    (27, "KEY_RIGHTBRACE"),
    (28, "KEY_ENTER"),
    (29, "KEY_LEFTCTRL"),
    (30, "KEY_A"),
    (31, "KEY_S"),
    (32, "KEY_D"),
    (33, "KEY_F"),
    (34, "KEY_G"),
    (35, "KEY_H"),
    (36, "KEY_J"),
    (37, "KEY_K"),
    (38, "KEY_L"),
    (39, "KEY_SEMICOLON"),
    (40, "KEY_APOSTROPHE"),
    (41, "KEY_GRAVE"),
    (42, "KEY_LEFTSHIFT"),
    (43, "KEY_BACKSLASH"),
    (44, "KEY_Z"),
    (45, "KEY_X"),
    (46, "KEY_C"),
    (47, "KEY_V"),
    (48, "KEY_B"),
    (49, "KEY_N"),
    (50, "KEY_M"),
    (51, "KEY_COMMA"),
    (52, "KEY_DOT"),
    (53, "KEY_SLASH"),
    (54, "KEY_RIGHTSHIFT"),
    (55, "KEY_KPASTERISK"),
    (56, "KEY_LEFTALT"),
    (57, "KEY_SPACE"),
    (58, "KEY_CAPSLOCK"),
    (59, "KEY_F1"),
    (60, "KEY_F2"),
    (61, "KEY_F3"),
    (62, "KEY_F4"),
    (63, "KEY_F5"),
    (64, "KEY_F6"),
    (65, "KEY_F7"),
    (66, "KEY_F8"),
    (67, "KEY_F9"),
    (68, "KEY_F10"),
    (69, "KEY_NUMLOCK"),
    (70, "KEY_SCROLLLOCK"),
    (71, "KEY_KP7"),
    (72, "KEY_KP8"),
    (73, "KEY_KP9"),
    (74, "KEY_KPMINUS"),
    (75, "KEY_KP4"),
    (76, "KEY_KP5"),
    (77, "KEY_KP6"),
    (78, "KEY_KPPLUS"),
    (79, "KEY_KP1"),
    (80, "KEY_KP2"),
    (81, "KEY_KP3"),
    (82, "KEY_KP0"),
    (83, "KEY_KPDOT"),
    (85, "KEY_ZENKAKUHANKAKU"),
    (86, "KEY_102ND"),
    (87, "KEY_F11"),
    (88, "KEY_F12"),
    (89, "KEY_RO"),
    (90, "KEY_KATAKANA"),
    (91, "KEY_HIRAGANA"),
    (92, "KEY_HENKAN"),
    (93, "KEY_KATAKANAHIRAGANA"),
    (94, "KEY_MUHENKAN"),
    (95, "KEY_KPJPCOMMA"),
    (96, "KEY_KPENTER"),
    (97, "KEY_RIGHTCTRL"),
    (98, "KEY_KPSLASH"),
    (99, "KEY_SYSRQ"),
    (100, "KEY_RIGHTALT"),
    (101, "KEY_LINEFEED"),
    (102, "KEY_HOME"),
    (103, "KEY_UP"),
    (104, "KEY_PAGEUP"),
    (105, "KEY_LEFT"),
    (106, "KEY_RIGHT"),
    (107, "KEY_END"),
    (108, "KEY_DOWN"),
    (109, "KEY_PAGEDOWN"),
    (110, "KEY_INSERT"),
    (111, "KEY_DELETE"),
    (112, "KEY_MACRO"),
    (113, "KEY_MUTE"),
    (114, "KEY_VOLUMEDOWN"),
    (115, "KEY_VOLUMEUP"),
    (116, "KEY_POWER"),
    (117, "KEY_KPEQUAL"),
    (118, "KEY_KPPLUSMINUS"),
    (119, "KEY_PAUSE"),
    (120, "KEY_SCALE"),
    (121, "KEY_KPCOMMA"),
    (122, "KEY_HANGEUL"),
    (123, "KEY_HANJA"),
    (124, "KEY_YEN"),
    (125, "KEY_LEFTMETA"),
    (126, "KEY_RIGHTMETA"),
    (127, "KEY_COMPOSE"),
    (128, "KEY_STOP"),
    (129, "KEY_AGAIN"),
    (130, "KEY_PROPS"),
    (131, "KEY_UNDO"),
    (132, "KEY_FRONT"),
    (133, "KEY_COPY"),
    (134, "KEY_OPEN"),
    (135, "KEY_PASTE"),
    (136, "KEY_FIND"),
    (137, "KEY_CUT"),
    (138, "KEY_HELP"),
    (139, "KEY_MENU"),
    (140, "KEY_CALC"),
    (141, "KEY_SETUP"),
    (142, "KEY_SLEEP"),
    (143, "KEY_WAKEUP"),
    (144, "KEY_FILE"),
    (145, "KEY_SENDFILE"),
    (146, "KEY_DELETEFILE"),
    (147, "KEY_XFER"),
    (148, "KEY_PROG1"),
    (149, "KEY_PROG2"),
    (150, "KEY_WWW"),
    (151, "KEY_MSDOS"),
    (152, "KEY_COFFEE"),
    (153, "KEY_ROTATE_DISPLAY"),
    (154, "KEY_CYCLEWINDOWS"),
    (155, "KEY_MAIL"),
    (156, "KEY_BOOKMARKS"),
    (157, "KEY_COMPUTER"),
    (158, "KEY_BACK"),
    (159, "KEY_FORWARD"),
    (160, "KEY_CLOSECD"),
    (161, "KEY_EJECTCD"),
    (162, "KEY_EJECTCLOSECD"),
    (163, "KEY_NEXTSONG"),
    (164, "KEY_PLAYPAUSE"),
    (165, "KEY_PREVIOUSSONG"),
    (166, "KEY_STOPCD"),
    (167, "KEY_RECORD"),
    (168, "KEY_REWIND"),
    (169, "KEY_PHONE"),
    (170, "KEY_ISO"),
    (171, "KEY_CONFIG"),
    (172, "KEY_HOMEPAGE"),
    (173, "KEY_REFRESH"),
    (174, "KEY_EXIT"),
    (175, "KEY_MOVE"),
    (176, "KEY_EDIT"),
    (177, "KEY_SCROLLUP"),
    (178, "KEY_SCROLLDOWN"),
    (179, "KEY_KPLEFTPAREN"),
    (180, "KEY_KPRIGHTPAREN"),
    (181, "KEY_NEW"),
    (182, "KEY_REDO"),
    (200, "KEY_PLAYCD"),
    (201, "KEY_PAUSECD"),
    (202, "KEY_PROG3"),
    (203, "KEY_PROG4"),
    (204, "KEY_ALL_APPLICATIONS"),
    (205, "KEY_SUSPEND"),
    (206, "KEY_CLOSE"),
    (207, "KEY_PLAY"),
    (208, "KEY_FASTFORWARD"),
    (209, "KEY_BASSBOOST"),
    (210, "KEY_PRINT"),
    (211, "KEY_HP"),
    (212, "KEY_CAMERA"),
    (213, "KEY_SOUND"),
    (214, "KEY_QUESTION"),
    (215, "KEY_EMAIL"),
    (216, "KEY_CHAT"),
    (217, "KEY_SEARCH"),
    (218, "KEY_CONNECT"),
    (219, "KEY_FINANCE"),
    (220, "KEY_SPORT"),
    (221, "KEY_SHOP"),
    (222, "KEY_ALTERASE"),
    (223, "KEY_CANCEL"),
    (224, "KEY_BRIGHTNESSDOWN"),
    (225, "KEY_BRIGHTNESSUP"),
    (226, "KEY_MEDIA"),
    (227, "KEY_SWITCHVIDEOMODE"),
    (228, "KEY_KBDILLUMTOGGLE"),
    (229, "KEY_KBDILLUMDOWN"),
    (230, "KEY_KBDILLUMUP"),
    (231, "KEY_SEND"),
    (232, "KEY_REPLY"),
    (233, "KEY_FORWARDMAIL"),
    (234, "KEY_SAVE"),
    (235, "KEY_DOCUMENTS"),
    (236, "KEY_BATTERY"),
    (237, "KEY_BLUETOOTH"),
    (238, "KEY_WLAN"),
    (239, "KEY_UWB"),
    (240, "KEY_UNKNOWN"),
    (241, "KEY_VIDEO_NEXT"),
    (242, "KEY_VIDEO_PREV"),
    (243, "KEY_BRIGHTNESS_CYCLE"),
    (244, "KEY_BRIGHTNESS_AUTO"),
    (245, "KEY_DISPLAY_OFF"),
    (246, "KEY_WWAN"),
    (247, "KEY_RFKILL"),
    (248, "KEY_MICMUTE"),
    (0x110, "BTN_LEFT"),
    (0x111, "BTN_RIGHT"),
    (0x112, "BTN_MIDDLE"),
    (0x113, "BTN_SIDE"),
    (0x114, "BTN_EXTRA"),
    (0x115, "BTN_FORWARD"),
    (0x116, "BTN_BACK"),
    (0x117, "BTN_TASK"),
    (0x120, "BTN_TRIGGER"),
    (0x121, "BTN_THUMB"),
    (0x122, "BTN_THUMB2"),
    (0x123, "BTN_TOP"),
    (0x124, "BTN_TOP2"),
    (0x125, "BTN_PINKIE"),
    (0x126, "BTN_BASE"),
    (0x127, "BTN_BASE2"),
    (0x128, "BTN_BASE3"),
    (0x129, "BTN_BASE4"),
    (0x12a, "BTN_BASE5"),
    (0x12b, "BTN_BASE6"),
    (0x12f, "BTN_DEAD"),
    (0x130, "BTN_SOUTH"),
    (0x131, "BTN_EAST"),
    (0x132, "BTN_C"),
    (0x133, "BTN_NORTH"),
    (0x134, "BTN_WEST"),
    (0x135, "BTN_Z"),
    (0x136, "BTN_TL"),
    (0x137, "BTN_TR"),
    (0x138, "BTN_TL2"),
    (0x139, "BTN_TR2"),
    (0x13a, "BTN_SELECT"),
    (0x13b, "BTN_START"),
    (0x13c, "BTN_MODE"),
    (0x13d, "BTN_THUMBL"),
    (0x13e, "BTN_THUMBR"),
    (0x140, "BTN_TOOL_PEN"),
    (0x141, "BTN_TOOL_RUBBER"),
    (0x142, "BTN_TOOL_BRUSH"),
    (0x143, "BTN_TOOL_PENCIL"),
    (0x144, "BTN_TOOL_AIRBRUSH"),
    (0x145, "BTN_TOOL_FINGER"),
    (0x146, "BTN_TOOL_MOUSE"),
    (0x147, "BTN_TOOL_LENS"),
    (0x148, "BTN_TOOL_QUINTTAP"),
    (0x149, "BTN_STYLUS3"),
    (0x14a, "BTN_TOUCH"),
    (0x14b, "BTN_STYLUS"),
    (0x14c, "BTN_STYLUS2"),
    (0x14d, "BTN_TOOL_DOUBLETAP"),
    (0x14e, "BTN_TOOL_TRIPLETAP"),
    (0x14f, "BTN_TOOL_QUADTAP"),
    (0x150, "BTN_GEAR_DOWN"),
    (0x151, "BTN_GEAR_UP"),
    (0x160, "KEY_OK"),
    (0x161, "KEY_SELECT"),
    (0x162, "KEY_GOTO"),
    (0x163, "KEY_CLEAR"),
    (0x164, "KEY_POWER2"),
    (0x165, "KEY_OPTION"),
    (0x166, "KEY_INFO"),
    (0x167, "KEY_TIME"),
    (0x168, "KEY_VENDOR"),
    (0x169, "KEY_ARCHIVE"),
    (0x16a, "KEY_PROGRAM"),
    (0x16b, "KEY_CHANNEL"),
    (0x16c, "KEY_FAVORITES"),
    (0x16d, "KEY_EPG"),
    (0x16e, "KEY_PVR"),
    (0x16f, "KEY_MHP"),
    (0x170, "KEY_LANGUAGE"),
    (0x171, "KEY_TITLE"),
    (0x172, "KEY_SUBTITLE"),
    (0x173, "KEY_ANGLE"),
    (0x174, "KEY_FULL_SCREEN"),
    (0x175, "KEY_MODE"),
    (0x176, "KEY_KEYBOARD"),
    (0x177, "KEY_ASPECT_RATIO"),
    (0x178, "KEY_PC"),
    (0x179, "KEY_TV"),
    (0x17a, "KEY_TV2"),
    (0x17b, "KEY_VCR"),
    (0x17c, "KEY_VCR2"),
    (0x17d, "KEY_SAT"),
    (0x17e, "KEY_SAT2"),
    (0x17f, "KEY_CD"),
    (0x180, "KEY_TAPE"),
    (0x181, "KEY_RADIO"),
    (0x182, "KEY_TUNER"),
    (0x183, "KEY_PLAYER"),
    (0x184, "KEY_TEXT"),
    (0x185, "KEY_DVD"),
    (0x186, "KEY_AUX"),
    (0x187, "KEY_MP3"),
    (0x188, "KEY_AUDIO"),
    (0x189, "KEY_VIDEO"),
    (0x18a, "KEY_DIRECTORY"),
    (0x18b, "KEY_LIST"),
    (0x18c, "KEY_MEMO"),
    (0x18d, "KEY_CALENDAR"),
    (0x18e, "KEY_RED"),
    (0x18f, "KEY_GREEN"),
    (0x190, "KEY_YELLOW"),
    (0x191, "KEY_BLUE"),
    (0x192, "KEY_CHANNELUP"),
    (0x193, "KEY_CHANNELDOWN"),
    (0x194, "KEY_FIRST"),
    (0x195, "KEY_LAST"),
    (0x196, "KEY_AB"),
    (0x197, "KEY_NEXT"),
    (0x198, "KEY_RESTART"),
    (0x199, "KEY_SLOW"),
    (0x19a, "KEY_SHUFFLE"),
    (0x19b, "KEY_BREAK"),
    (0x19c, "KEY_PREVIOUS"),
    (0x19d, "KEY_DIGITS"),
    (0x19e, "KEY_TEEN"),
    (0x19f, "KEY_TWEN"),
    (0x1a0, "KEY_VIDEOPHONE"),
    (0x1a1, "KEY_GAMES"),
    (0x1a2, "KEY_ZOOMIN"),
    (0x1a3, "KEY_ZOOMOUT"),
    (0x1a4, "KEY_ZOOMRESET"),
    (0x1a5, "KEY_WORDPROCESSOR"),
    (0x1a6, "KEY_EDITOR"),
    (0x1a7, "KEY_SPREADSHEET"),
    (0x1a8, "KEY_GRAPHICSEDITOR"),
    (0x1a9, "KEY_PRESENTATION"),
    (0x1aa, "KEY_DATABASE"),
    (0x1ab, "KEY_NEWS"),
    (0x1ac, "KEY_VOICEMAIL"),
    (0x1ad, "KEY_ADDRESSBOOK"),
    (0x1ae, "KEY_MESSENGER"),
    (0x1af, "KEY_DISPLAYTOGGLE"),
    (0x1b0, "KEY_SPELLCHECK"),
    (0x1b1, "KEY_LOGOFF"),
    (0x1b2, "KEY_DOLLAR"),
    (0x1b3, "KEY_EURO"),
    (0x1b4, "KEY_FRAMEBACK"),
    (0x1b5, "KEY_FRAMEFORWARD"),
    (0x1b6, "KEY_CONTEXT_MENU"),
    (0x1b7, "KEY_MEDIA_REPEAT"),
    (0x1b8, "KEY_10CHANNELSUP"),
    (0x1b9, "KEY_10CHANNELSDOWN"),
    (0x1ba, "KEY_IMAGES"),
    (0x1bc, "KEY_NOTIFICATION_CENTER"),
    (0x1bd, "KEY_PICKUP_PHONE"),
    (0x1be, "KEY_HANGUP_PHONE"),
    (0x1c0, "KEY_DEL_EOL"),
    (0x1c1, "KEY_DEL_EOS"),
    (0x1c2, "KEY_INS_LINE"),
    (0x1c3, "KEY_DEL_LINE"),
    (0x1d0, "KEY_FN"),
    (0x1d1, "KEY_FN_ESC"),
    (0x1de, "KEY_FN_1"),
    (0x1df, "KEY_FN_2"),
    (0x1e0, "KEY_FN_D"),
    (0x1e1, "KEY_FN_E"),
    (0x1e2, "KEY_FN_F"),
    (0x1e3, "KEY_FN_S"),
    (0x1e4, "KEY_FN_B"),
    (0x1e5, "KEY_FN_RIGHT_SHIFT"),
    (0x20a, "KEY_NUMERIC_STAR"),
    (0x20b, "KEY_NUMERIC_POUND"),
    (0x20c, "KEY_NUMERIC_A"),
    (0x20d, "KEY_NUMERIC_B"),
    (0x20e, "KEY_NUMERIC_C"),
    (0x20f, "KEY_NUMERIC_D"),
    (0x210, "KEY_CAMERA_FOCUS"),
    (0x211, "KEY_WPS_BUTTON"),
    (0x212, "KEY_TOUCHPAD_TOGGLE"),
    (0x213, "KEY_TOUCHPAD_ON"),
    (0x214, "KEY_TOUCHPAD_OFF"),
    (0x215, "KEY_CAMERA_ZOOMIN"),
    (0x216, "KEY_CAMERA_ZOOMOUT"),
    (0x217, "KEY_CAMERA_UP"),
    (0x218, "KEY_CAMERA_DOWN"),
    (0x219, "KEY_CAMERA_LEFT"),
    (0x21a, "KEY_CAMERA_RIGHT"),
    (0x21b, "KEY_ATTENDANT_ON"),
    (0x21c, "KEY_ATTENDANT_OFF"),
    (0x21d, "KEY_ATTENDANT_TOGGLE"),
    (0x21e, "KEY_LIGHTS_TOGGLE"),
    (0x220, "BTN_DPAD_UP"),
    (0x221, "BTN_DPAD_DOWN"),
    (0x222, "BTN_DPAD_LEFT"),
    (0x223, "BTN_DPAD_RIGHT"),
    (0x230, "KEY_ALS_TOGGLE"),
    (0x231, "KEY_ROTATE_LOCK_TOGGLE"),
    (0x240, "KEY_BUTTONCONFIG"),
    (0x241, "KEY_TASKMANAGER"),
    (0x242, "KEY_JOURNAL"),
    (0x243, "KEY_CONTROLPANEL"),
    (0x244, "KEY_APPSELECT"),
    (0x245, "KEY_SCREENSAVER"),
    (0x246, "KEY_VOICECOMMAND"),
    (0x247, "KEY_ASSISTANT"),
    (0x248, "KEY_KBD_LAYOUT_NEXT"),
    (0x249, "KEY_EMOJI_PICKER"),
    (0x24a, "KEY_DICTATE"),
    (0x250, "KEY_BRIGHTNESS_MIN"),
    (0x251, "KEY_BRIGHTNESS_MAX"),
    (0x260, "KEY_KBDINPUTASSIST_PREV"),
    (0x261, "KEY_KBDINPUTASSIST_NEXT"),
    (0x262, "KEY_KBDINPUTASSIST_PREVGROUP"),
    (0x263, "KEY_KBDINPUTASSIST_NEXTGROUP"),
    (0x264, "KEY_KBDINPUTASSIST_ACCEPT"),
    (0x265, "KEY_KBDINPUTASSIST_CANCEL"),
    (0x266, "KEY_RIGHT_UP"),
    (0x267, "KEY_RIGHT_DOWN"),
    (0x268, "KEY_LEFT_UP"),
    (0x269, "KEY_LEFT_DOWN"),
    (0x26a, "KEY_ROOT_MENU"),
    (0x26b, "KEY_MEDIA_TOP_MENU"),
    (0x26c, "KEY_NUMERIC_11"),
    (0x26d, "KEY_NUMERIC_12"),
    (0x26e, "KEY_AUDIO_DESC"),
    (0x26f, "KEY_3D_MODE"),
    (0x270, "KEY_NEXT_FAVORITE"),
    (0x271, "KEY_STOP_RECORD"),
    (0x272, "KEY_PAUSE_RECORD"),
    (0x273, "KEY_VOD"),
    (0x274, "KEY_UNMUTE"),
    (0x275, "KEY_FASTREVERSE"),
    (0x276, "KEY_SLOWREVERSE"),
    (0x277, "KEY_DATA"),
    (0x278, "KEY_ONSCREEN_KEYBOARD"),
    (0x279, "KEY_PRIVACY_SCREEN_TOGGLE"),
    (0x27a, "KEY_SELECTIVE_SCREENSHOT"),
];

/// Numbered name runs: (first code, prefix, first number, count)
const NUMBERED_RUNS: &[(u16, &str, u16, u16)] = &[
    (183, "KEY_F", 13, 12),
    (0x100, "BTN_", 0, 10),
    (0x1d2, "KEY_FN_F", 1, 12),
    (0x1f1, "KEY_BRL_DOT", 1, 10),
    (0x200, "KEY_NUMERIC_", 0, 10),
    (0x2c0, "BTN_TRIGGER_HAPPY", 1, 40),
];

/// Immutable code -> name lookup shared by the decoder
#[derive(Debug, Clone)]
pub struct KeyNameTable {
    names: Vec<Option<Cow<'static, str>>>,
}

impl KeyNameTable {
    /// Table holding only the built-in kernel names
    pub fn builtin() -> Self {
        let mut names: Vec<Option<Cow<'static, str>>> = vec![None; KEY_CNT];
        for &(code, name) in BUILTIN_NAMES {
            names[code as usize] = Some(Cow::Borrowed(name));
        }
        for &(first, prefix, start, count) in NUMBERED_RUNS {
            for i in 0..count {
                names[(first + i) as usize] = Some(Cow::Owned(format!("{}{}", prefix, start + i)));
            }
        }
        Self { names }
    }

    /// Built-in table patched from `path`. An unreadable file is logged
    /// and the built-in names are kept.
    pub fn load(path: Option<&Path>) -> Self {
        let mut table = Self::builtin();
        if let Some(path) = path {
            match table.load_overrides(path) {
                Ok(count) => info!("Loaded {} key name overrides from {}", count, path.display()),
                Err(e) => warn!("{:#}", e),
            }
        }
        table
    }

    /// Apply an override file, returning the number of names replaced
    pub fn load_overrides(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not open translation table {}", path.display()))?;
        Ok(self.apply_overrides(&content))
    }

    /// Apply `<code-or-name> = <new-name>` lines. Blank, comment and
    /// malformed lines are skipped.
    pub fn apply_overrides(&mut self, content: &str) -> usize {
        let mut applied = 0;
        for line in content.lines() {
            let Some((key, new_name)) = parse_override_line(line) else {
                continue;
            };
            let Some(code) = self.resolve(key) else {
                debug!("Ignoring override for unknown key {}", key);
                continue;
            };
            self.names[code] = Some(Cow::Owned(new_name.to_string()));
            applied += 1;
        }
        applied
    }

    /// Symbolic name for `code`, if the table has one
    pub fn lookup(&self, code: u16) -> Option<&str> {
        self.names.get(code as usize).and_then(|n| n.as_deref())
    }

    /// Resolve an override key: a non-zero numeric code, else a current name
    fn resolve(&self, key: &str) -> Option<usize> {
        match parse_code(key) {
            0 => self
                .names
                .iter()
                .take(KEY_MAX as usize)
                .position(|n| n.as_deref() == Some(key)),
            code => (code < KEY_MAX as u64).then_some(code as usize),
        }
    }
}

/// Split an override line into its two tokens. The key is a single word
/// that must be followed by whitespace or `=`, so `115=LOUDER` is read as
/// one word with no `=` after it and rejected.
fn parse_override_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_start();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, rest) = line.split_at(line.find(char::is_whitespace).unwrap_or(line.len()));
    let rest = rest.trim_start().strip_prefix('=')?;
    let value = rest.split_whitespace().next()?;
    Some((key, value))
}

/// Read the leading number of `token` the way strtoul(.., 0) does: 0x hex,
/// leading-0 octal, otherwise decimal. Trailing garbage is ignored and a
/// token without digits reads as 0.
fn parse_code(token: &str) -> u64 {
    let (negative, digits) = match token.as_bytes().first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };
    let (radix, digits) = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) if hex.starts_with(|c: char| c.is_ascii_hexdigit()) => (16, hex),
        _ if digits.starts_with('0') => (8, digits),
        _ => (10, digits),
    };
    let value = digits
        .chars()
        .map_while(|c| c.to_digit(radix))
        .fold(0u64, |acc, d| acc.saturating_mul(u64::from(radix)).saturating_add(u64::from(d)));
    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        let table = KeyNameTable::builtin();
        assert_eq!(table.lookup(1), Some("KEY_ESC"));
        assert_eq!(table.lookup(88), Some("KEY_F12"));
        assert_eq!(table.lookup(115), Some("KEY_VOLUMEUP"));
        assert_eq!(table.lookup(0x160), Some("KEY_OK"));
        assert_eq!(table.lookup(183), Some("KEY_F13"));
        assert_eq!(table.lookup(194), Some("KEY_F24"));
        assert_eq!(table.lookup(0x100), Some("BTN_0"));
        assert_eq!(table.lookup(0x2e7), Some("BTN_TRIGGER_HAPPY40"));
        assert_eq!(table.lookup(84), None);
        assert_eq!(table.lookup(KEY_MAX), None);
        assert_eq!(table.lookup(0xffff), None);
    }

    #[test]
    fn test_override_by_code_and_name() {
        let mut table = KeyNameTable::builtin();
        let applied = table.apply_overrides(
            "# remote tweaks\n\
             \n\
             0x160 = KEY_ENTER\n\
             KEY_RED = KEY_A\n\
             115 =LOUDER\n\
             garbage line\n\
             KEY_NOSUCH = KEY_B\n\
             = KEY_C\n",
        );
        assert_eq!(applied, 3);
        assert_eq!(table.lookup(0x160), Some("KEY_ENTER"));
        assert_eq!(table.lookup(0x18e), Some("KEY_A"));
        assert_eq!(table.lookup(115), Some("LOUDER"));
    }

    #[test]
    fn test_override_key_must_be_separated_from_equals() {
        let mut table = KeyNameTable::builtin();
        assert_eq!(table.apply_overrides("115=LOUDER\n"), 0);
        assert_eq!(table.apply_overrides("115= LOUDER\n"), 0);
        assert_eq!(table.lookup(115), Some("KEY_VOLUMEUP"));

        assert_eq!(table.apply_overrides("  114\t=\tQUIETER trailing\n"), 1);
        assert_eq!(table.lookup(114), Some("QUIETER"));
    }

    #[test]
    fn test_override_code_ignores_trailing_garbage() {
        let mut table = KeyNameTable::builtin();
        assert_eq!(table.apply_overrides("115abc = LOUDER\n0x160zz = KEY_ENTER\n"), 2);
        assert_eq!(table.lookup(115), Some("LOUDER"));
        assert_eq!(table.lookup(0x160), Some("KEY_ENTER"));
    }

    #[test]
    fn test_override_code_limits() {
        let mut table = KeyNameTable::builtin();
        // KEY_MAX itself and beyond are rejected; 0 falls back to name lookup
        assert_eq!(table.apply_overrides("0x2ff = KEY_X\n0 = KEY_Y\n"), 0);
        assert_eq!(table.apply_overrides("0100 = EIGHT_OCTAL\n"), 1);
        assert_eq!(table.lookup(64), Some("EIGHT_OCTAL"));
    }

    #[test]
    fn test_load_overrides_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keymap");
        std::fs::write(&path, "KEY_OK = KEY_SELECT\n").unwrap();

        let table = KeyNameTable::load(Some(&path));
        assert_eq!(table.lookup(0x160), Some("KEY_SELECT"));

        let missing = KeyNameTable::load(Some(&dir.path().join("missing")));
        assert_eq!(missing.lookup(0x160), Some("KEY_OK"));
    }
}
