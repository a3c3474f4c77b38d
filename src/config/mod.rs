//! Configuration file management
//!
//! Loads the optional TOML configuration file and merges command line
//! arguments on top of it.
//! Default config path: ~/.config/evlirc/config.toml

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::args::Args;
use crate::constants::{
    DEFAULT_AUTOREPEAT_DELAY_MS, DEFAULT_AUTOREPEAT_PERIOD_MS, DEFAULT_INPUT_DIR, DEFAULT_KEY_MIN,
    DEFAULT_REPEAT_WINDOW_MS, DEFAULT_RUN_AS_USER, DEFAULT_SOCKET_PATH,
};
use crate::error::DaemonError;
use crate::input::keycodes::KEY_MAX;
use crate::input::{AutorepeatTiming, DecoderSettings, DeviceSelector, RegistryOptions};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which devices to read
    pub devices: DevicesConfig,
    /// Key filtering and repeat counting
    pub decoder: DecoderConfig,
    /// Software autorepeat
    pub autorepeat: AutorepeatConfig,
    /// Listening socket
    pub server: ServerConfig,
    /// Process settings
    pub daemon: DaemonConfig,
}

/// Device selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    /// Device nodes; glob patterns are expanded
    pub paths: Vec<String>,
    /// Case-insensitive globs over device names
    pub names: Vec<String>,
    /// Grab devices for exclusive access
    pub grab: bool,
    /// Directory scanned when matching names
    pub input_dir: PathBuf,
    /// Watch udev for new input devices
    pub hotplug: bool,
}

/// Decoder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Lowest key code reported
    pub key_min: u16,
    /// Report modifiers as name prefixes
    pub capture_modifiers: bool,
    /// Repeat-coalescing window in milliseconds (0 = off)
    pub repeat_window_ms: u64,
    /// Key name override file
    pub keymap: Option<PathBuf>,
}

/// Software autorepeat settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutorepeatConfig {
    pub enabled: bool,
    /// Delay before the first repeat (ms)
    pub delay_ms: u64,
    /// Time between repeats (ms)
    pub period_ms: u64,
}

/// Listening socket settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub socket: PathBuf,
    /// Name reported to clients instead of the device path
    pub source_name: Option<String>,
}

/// Process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// User to switch to after binding the socket (only when started as root)
    pub user: String,
    /// Stay in the foreground
    pub foreground: bool,
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            names: Vec::new(),
            grab: false,
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            hotplug: true,
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            key_min: DEFAULT_KEY_MIN,
            capture_modifiers: false,
            repeat_window_ms: DEFAULT_REPEAT_WINDOW_MS,
            keymap: None,
        }
    }
}

impl Default for AutorepeatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_ms: DEFAULT_AUTOREPEAT_DELAY_MS,
            period_ms: DEFAULT_AUTOREPEAT_PERIOD_MS,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket: PathBuf::from(DEFAULT_SOCKET_PATH),
            source_name: None,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            user: DEFAULT_RUN_AS_USER.to_string(),
            foreground: false,
        }
    }
}

impl Config {
    /// System-wide config file path
    pub const SYSTEM_CONFIG_PATH: &'static str = "/etc/evlirc/config.toml";

    /// Get config file path (search order)
    ///
    /// 1. EVLIRC_CONFIG environment variable
    /// 2. ~/.config/evlirc/config.toml (user config)
    /// 3. /etc/evlirc/config.toml (system config)
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("EVLIRC_CONFIG") {
            let p = Path::new(&path);
            if p.exists() {
                return Some(p.to_path_buf());
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("evlirc").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }
        }

        let system_config = Path::new(Self::SYSTEM_CONFIG_PATH);
        if system_config.exists() {
            return Some(system_config.to_path_buf());
        }

        None
    }

    /// Load settings.
    ///
    /// An explicitly named file must load. A discovered file that fails to
    /// load is reported and the defaults are used instead.
    pub fn load(explicit: Option<&Path>) -> Result<Self, DaemonError> {
        if let Some(path) = explicit {
            let config =
                Self::load_from_file(path).map_err(|e| DaemonError::Config(format!("{:#}", e)))?;
            info!("Loaded config: {}", path.display());
            return Ok(config);
        }

        if let Some(path) = Self::config_path() {
            match Self::load_from_file(&path) {
                Ok(config) => {
                    info!("Loaded config: {}", path.display());
                    return Ok(config);
                }
                Err(e) => {
                    warn!("Failed to load config {}: {:#}", path.display(), e);
                }
            }
        }
        debug!("Using built-in default config");
        Ok(Self::default())
    }

    /// Load settings from specified path
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Apply command line arguments on top of file values
    pub fn apply_args(&mut self, args: &Args) {
        if !args.devices.is_empty() || !args.names.is_empty() {
            self.devices.paths = args
                .devices
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            self.devices.names = args.names.clone();
        }
        if args.grab {
            self.devices.grab = true;
        }

        if let Some(key_min) = args.key_min {
            self.decoder.key_min = key_min;
        }
        if args.capture_modifiers {
            self.decoder.capture_modifiers = true;
        }
        if let Some(ms) = args.repeat_window_ms {
            self.decoder.repeat_window_ms = ms;
        }
        if let Some(keymap) = &args.keymap {
            self.decoder.keymap = Some(keymap.clone());
        }

        if args.autorepeat {
            self.autorepeat.enabled = true;
        }
        if let Some(timing) = args.autorepeat_timing {
            self.autorepeat.enabled = true;
            self.autorepeat.delay_ms = timing.delay.as_millis() as u64;
            self.autorepeat.period_ms = timing.period.as_millis() as u64;
        }

        if let Some(socket) = &args.socket {
            self.server.socket = socket.clone();
        }
        if let Some(name) = &args.source_name {
            self.server.source_name = Some(name.clone());
        }

        if let Some(user) = &args.user {
            self.daemon.user = user.clone();
        }
        if args.foreground {
            self.daemon.foreground = true;
        }
    }

    /// Reject settings the daemon cannot run with
    pub fn validate(&self) -> Result<(), DaemonError> {
        if self.devices.paths.is_empty() && self.devices.names.is_empty() {
            return Err(DaemonError::Usage(
                "no input devices given (pass device paths or -n <pattern>)".to_string(),
            ));
        }
        if self.autorepeat.enabled && (self.autorepeat.delay_ms == 0 || self.autorepeat.period_ms == 0) {
            return Err(DaemonError::Config(
                "autorepeat delay and period must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn decoder_settings(&self) -> DecoderSettings {
        DecoderSettings {
            key_min: self.decoder.key_min,
            key_max: KEY_MAX,
            capture_modifiers: self.decoder.capture_modifiers,
            repeat_window: Duration::from_millis(self.decoder.repeat_window_ms),
        }
    }

    /// Autorepeat timing, `None` when disabled
    pub fn autorepeat_timing(&self) -> Option<AutorepeatTiming> {
        self.autorepeat.enabled.then(|| AutorepeatTiming {
            delay: Duration::from_millis(self.autorepeat.delay_ms),
            period: Duration::from_millis(self.autorepeat.period_ms),
        })
    }

    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            grab: self.devices.grab,
            decoder: self.decoder_settings(),
            autorepeat: self.autorepeat_timing(),
        }
    }

    /// Device selectors: expanded paths first, then name patterns
    pub fn selectors(&self) -> Result<Vec<DeviceSelector>, DaemonError> {
        let mut selectors = Vec::new();
        for pattern in &self.devices.paths {
            for path in expand_device_path(pattern)? {
                selectors.push(DeviceSelector::Path(path));
            }
        }
        selectors.extend(self.devices.names.iter().cloned().map(DeviceSelector::Named));
        Ok(selectors)
    }
}

/// Expand a device argument. Text without glob characters is used as is.
fn expand_device_path(pattern: &str) -> Result<Vec<PathBuf>, DaemonError> {
    if !pattern.contains(['*', '?', '[']) {
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let paths = glob::glob(pattern)
        .map_err(|e| DaemonError::Usage(format!("invalid device pattern {:?}: {}", pattern, e)))?;
    let mut matched = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => matched.push(path),
            Err(e) => warn!("Skipping {}: {}", e.path().display(), e.error()),
        }
    }
    if matched.is_empty() {
        warn!("No device matches {}", pattern);
    }
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.decoder.key_min, 88);
        assert_eq!(config.server.socket, PathBuf::from("/run/lirc/lircd"));
        assert_eq!(config.daemon.user, "nobody");
        assert!(config.devices.hotplug);
        assert!(config.autorepeat_timing().is_none());
        assert_eq!(config.decoder_settings().repeat_window, Duration::ZERO);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [devices]
            names = ["*IR Remote*"]
            grab = true

            [autorepeat]
            enabled = true
            period_ms = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.devices.names, vec!["*IR Remote*".to_string()]);
        assert!(config.devices.grab);
        let timing = config.autorepeat_timing().unwrap();
        assert_eq!(timing.delay, Duration::from_millis(250));
        assert_eq!(timing.period, Duration::from_millis(50));
        assert_eq!(config.decoder.key_min, 88);
    }

    #[test]
    fn test_args_override_file() {
        let mut config: Config = toml::from_str(
            r#"
            [devices]
            paths = ["/dev/input/event1"]
            [server]
            socket = "/tmp/file-socket"
            "#,
        )
        .unwrap();
        let args = Args::try_parse_from([
            "evlircd", "-d", "/tmp/cli-socket", "-m", "0", "-A", "300:40", "/dev/input/event7",
        ])
        .unwrap();
        config.apply_args(&args);

        assert_eq!(config.server.socket, PathBuf::from("/tmp/cli-socket"));
        assert_eq!(config.devices.paths, vec!["/dev/input/event7".to_string()]);
        assert_eq!(config.decoder.key_min, 0);
        assert!(config.autorepeat.enabled);
        assert_eq!(config.autorepeat.delay_ms, 300);
        assert_eq!(config.autorepeat.period_ms, 40);
    }

    #[test]
    fn test_file_devices_kept_without_cli_devices() {
        let mut config = Config::default();
        config.devices.names = vec!["remote*".to_string()];
        config.apply_args(&Args::try_parse_from(["evlircd", "-g"]).unwrap());
        assert_eq!(config.devices.names, vec!["remote*".to_string()]);
        assert!(config.devices.grab);
    }

    #[test]
    fn test_no_devices_is_usage_error() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(err, DaemonError::Usage(_)));
        assert_eq!(err.exit_code(), 64);
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, DaemonError::Config(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[daemon]\nuser = \"lirc\"\nforeground = true\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.daemon.user, "lirc");
        assert!(config.daemon.foreground);
    }

    #[test]
    fn test_selectors_expand_globs() {
        let dir = tempfile::tempdir().unwrap();
        for node in ["event0", "event1", "mice"] {
            std::fs::write(dir.path().join(node), b"").unwrap();
        }
        let mut config = Config::default();
        config.devices.paths = vec![
            format!("{}/event*", dir.path().display()),
            "/dev/input/by-id/literal".to_string(),
        ];
        config.devices.names = vec!["*remote*".to_string()];

        let selectors = config.selectors().unwrap();
        assert_eq!(
            selectors,
            vec![
                DeviceSelector::Path(dir.path().join("event0")),
                DeviceSelector::Path(dir.path().join("event1")),
                DeviceSelector::Path(PathBuf::from("/dev/input/by-id/literal")),
                DeviceSelector::Named("*remote*".to_string()),
            ]
        );
    }
}
