//! evlircd - LIRC-compatible key event broadcaster for Linux input devices
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              Event Loop                  │
//! ├──────────────────────────────────────────┤
//! │  Input (evdev)  →  Decoder (per device)  │
//! │                          ↓               │
//! │              Protocol line               │
//! │                          ↓               │
//! │          Clients (Unix socket)           │
//! └──────────────────────────────────────────┘
//! ```

mod args;
mod config;
mod constants;
mod daemon;
mod error;
mod input;
mod protocol;
mod scheduler;
mod server;

use clap::Parser;
use log::{error, info, warn};
use std::process::ExitCode;

use crate::args::Args;
use crate::config::Config;
use crate::constants::{EX_USAGE, RESCAN_INTERVAL};
use crate::error::DaemonError;
use crate::input::{DeviceRegistry, EvdevOpener, HotplugMonitor, KeyNameTable};
use crate::scheduler::Scheduler;
use crate::server::ListenSocket;

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let is_error = e.use_stderr();
            let _ = e.print();
            return if is_error {
                ExitCode::from(EX_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(args: &Args) -> Result<(), DaemonError> {
    let mut config = Config::load(args.config.as_deref())?;
    config.apply_args(args);
    config.validate()?;

    let opener = EvdevOpener::new(&config.devices.input_dir);
    let mut registry = DeviceRegistry::new(opener, config.registry_options());
    for selector in config.selectors()? {
        registry
            .add(&selector)
            .map_err(|e| DaemonError::Usage(format!("{:#}", e)))?;
    }
    if registry.open_count() == 0 {
        return Err(DaemonError::NoDevices);
    }

    let names = KeyNameTable::load(config.decoder.keymap.as_deref());
    let listener = ListenSocket::bind(&config.server.socket)?;

    daemon::drop_privileges(&config.daemon.user)?;
    if !config.daemon.foreground {
        daemon::daemonize()?;
    }
    daemon::setup_signal_handlers();

    let hotplug = if config.devices.hotplug {
        match HotplugMonitor::new() {
            Ok(monitor) => Some(monitor),
            Err(e) => {
                warn!("Hotplug monitoring unavailable, relying on periodic rescan: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    let mut scheduler = Scheduler::new(
        registry,
        listener,
        names,
        config.server.source_name.clone(),
        RESCAN_INTERVAL,
    )
    .with_hotplug(hotplug);

    daemon::notify_ready();
    let result = scheduler.run();
    daemon::notify_stopping();
    result?;

    info!("Exiting");
    Ok(())
}
