//! Command line arguments

use clap::builder::ValueHint;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::input::AutorepeatTiming;

#[derive(Parser, Debug)]
#[command(
    name = "evlircd",
    version,
    about = "Broadcast key presses from Linux event devices to LIRC clients"
)]
pub struct Args {
    #[arg(
        value_name = "device",
        help = "Event device nodes to read; glob patterns are expanded",
        value_hint = ValueHint::FilePath
    )]
    pub devices: Vec<PathBuf>,

    #[arg(
        short = 'n',
        long = "name",
        value_name = "pattern",
        help = "Read every event device whose name matches this case-insensitive glob (repeatable)"
    )]
    pub names: Vec<String>,

    #[arg(
        short = 'd',
        long = "socket",
        value_name = "path",
        help = "Listening socket path",
        value_hint = ValueHint::FilePath
    )]
    pub socket: Option<PathBuf>,

    #[arg(short = 'g', long, help = "Grab devices for exclusive access")]
    pub grab: bool,

    #[arg(
        short = 'c',
        long = "capture-modifiers",
        help = "Report modifier keys as CTRL_/SHIFT_/ALT_/META_ prefixes instead of as keys"
    )]
    pub capture_modifiers: bool,

    #[arg(
        short = 'm',
        long = "key-min",
        value_name = "code",
        help = "Ignore key codes below this value"
    )]
    pub key_min: Option<u16>,

    #[arg(
        short = 'r',
        long = "repeat-window",
        value_name = "ms",
        help = "Count presses of the same key closer together than this as repeats"
    )]
    pub repeat_window_ms: Option<u64>,

    #[arg(
        short = 't',
        long = "keymap",
        value_name = "file",
        help = "Key name override file (<code-or-name> = <new-name> per line)",
        value_hint = ValueHint::FilePath
    )]
    pub keymap: Option<PathBuf>,

    #[arg(
        short = 'N',
        long = "source-name",
        value_name = "name",
        help = "Name reported to clients instead of the device path"
    )]
    pub source_name: Option<String>,

    #[arg(
        short = 'a',
        long,
        help = "Emulate autorepeat on devices without hardware repeat"
    )]
    pub autorepeat: bool,

    #[arg(
        short = 'A',
        long = "autorepeat-timing",
        value_name = "delay:period",
        value_parser = parse_autorepeat_timing,
        help = "Autorepeat delay and period in milliseconds (implies --autorepeat)"
    )]
    pub autorepeat_timing: Option<AutorepeatTiming>,

    #[arg(
        short = 'u',
        long,
        value_name = "user",
        help = "User to switch to after binding the socket"
    )]
    pub user: Option<String>,

    #[arg(short = 'f', long, help = "Stay in the foreground")]
    pub foreground: bool,

    #[arg(
        long,
        value_name = "file",
        help = "Path to configuration (TOML) file. Command line arguments override its values.",
        value_hint = ValueHint::FilePath
    )]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Log at debug level unless RUST_LOG says otherwise")]
    pub debug: bool,
}

/// Parse `delay:period`, both positive millisecond counts
pub fn parse_autorepeat_timing(s: &str) -> Result<AutorepeatTiming, String> {
    let (delay, period) = s
        .split_once(':')
        .ok_or_else(|| format!("expected delay:period, got {:?}", s))?;
    let parse = |part: &str| -> Result<u64, String> {
        match part.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => Ok(ms),
            _ => Err(format!("{:?} is not a positive number of milliseconds", part)),
        }
    };
    Ok(AutorepeatTiming {
        delay: Duration::from_millis(parse(delay)?),
        period: Duration::from_millis(parse(period)?),
    })
}
