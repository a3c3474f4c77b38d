//! LIRC wire format
//!
//! One ASCII line per reported key:
//! `<code:hex> <repeat:hex> [CTRL_][SHIFT_][ALT_][META_]<KEYNAME> <source>\n`
//!
//! Codes without a name go out as `KEY_CODE_<decimal>`, without prefixes.

use std::fmt::Write;

use crate::input::decoder::KeyReport;
use crate::input::keycodes::Modifiers;
use crate::input::keynames::KeyNameTable;

/// Render one report as a protocol line
pub fn format_line(report: &KeyReport, names: &KeyNameTable, source: &str) -> String {
    let mut line = String::with_capacity(64);
    let _ = write!(line, "{:x} {:x} ", report.code, report.repeat);

    match names.lookup(report.code) {
        Some(name) => {
            for (flag, prefix) in Modifiers::PREFIXES {
                if report.modifiers.contains(flag) {
                    line.push_str(prefix);
                }
            }
            line.push_str(name);
        }
        None => {
            let _ = write!(line, "KEY_CODE_{}", report.code);
        }
    }

    line.push(' ');
    line.push_str(source);
    line.push('\n');
    line
}
