//! Configuration for ledshows
//!
//! The configuration is a TOML file with three sections:
//!
//! - `[strip]` - driver, strip length and brightness limits
//! - `[control]` - topic prefix of the control channel
//! - `[shows]` - startup and fallback shows, stop timeout, refresh interval
//!
//! Every field has a default, so a user file only needs the values that
//! differ. The configuration is loaded once at startup and passed around
//! by reference.
//!
//! # Location
//!
//! Unless `--config` is given, the file is looked up in the platform's
//! configuration directory:
//! - **Linux**: `~/.config/ledshows/config.toml`
//! - **macOS**: `~/Library/Application Support/ledshows/config.toml`
//!
//! # Example
//!
//! ```toml
//! sys_name = "livingroom"
//!
//! [strip]
//! driver = "apa102"
//! num_leds = 300
//! max_global_brightness = 0.6
//!
//! [shows]
//! fallback_show = "idle"
//! ```

use crate::driver::ColorOrder;
use crate::error::{Result, StripError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name below the platform config dir
pub const APP_ID: &str = "ledshows";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default time a show gets to react to a stop request
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 5000;

/// Default interval between strip refreshes once a show body has returned
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 100;

/// Default path of the configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No file at the default location, if there is one
    Defaults(Option<PathBuf>),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "from {:?}", path),
            ConfigSource::Defaults(Some(path)) => write!(f, "defaults (no file at {:?})", path),
            ConfigSource::Defaults(None) => write!(f, "defaults (no config directory)"),
        }
    }
}

/// Which strip driver to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// APA102 / SK9822 over a spidev device
    #[default]
    Apa102,
    /// No hardware
    Dummy,
}

/// Strip hardware settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    pub driver: DriverKind,
    pub num_leds: usize,
    pub spi_device: PathBuf,
    pub max_clock_speed_hz: u32,
    /// Global brightness after startup, 0.0 - 1.0
    pub initial_brightness: f32,
    /// Upper bound for every global brightness request, 0.0 - 1.0
    pub max_global_brightness: f32,
    pub color_order: ColorOrder,
    /// Send the extra start frame SK9822 chips need to latch
    pub sk9822_compatibility: bool,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::Apa102,
            num_leds: 100,
            spi_device: PathBuf::from("/dev/spidev0.1"),
            max_clock_speed_hz: 4_000_000,
            initial_brightness: 0.5,
            max_global_brightness: 0.75,
            color_order: ColorOrder::Bgr,
            sk9822_compatibility: true,
        }
    }
}

/// Control channel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// First topic level of every control topic
    pub prefix: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            prefix: "led".to_string(),
        }
    }
}

/// Scheduling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowConfig {
    /// Show started once the controller is up
    pub startup_show: String,
    /// Show started whenever a show ends or is rejected
    pub fallback_show: String,
    pub stop_timeout_ms: u64,
    pub refresh_interval_ms: u64,
}

impl Default for ShowConfig {
    fn default() -> Self {
        Self {
            startup_show: "clear".to_string(),
            fallback_show: "idle".to_string(),
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
        }
    }
}

impl ShowConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Second topic level, identifies this controller
    pub sys_name: String,
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// Also write logs to this file
    pub log_file: Option<PathBuf>,
    pub strip: StripConfig,
    pub control: ControlConfig,
    pub shows: ShowConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sys_name: "ledstrip".to_string(),
            log_level: "info".to_string(),
            log_file: None,
            strip: StripConfig::default(),
            control: ControlConfig::default(),
            shows: ShowConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StripError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config = Self::from_toml(&content).map_err(|e| {
            StripError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file at `path` if it exists, defaults otherwise
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        Self::resolve(None, Some(path.as_ref().to_path_buf())).map(|(config, _)| config)
    }

    /// Load `explicit`, which has to exist, or else the file at `fallback`
    /// if there is one
    ///
    /// Nothing is logged here since logging is set up from the result.
    pub fn resolve(explicit: Option<&Path>, fallback: Option<PathBuf>) -> Result<(Self, ConfigSource)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, ConfigSource::File(path.to_path_buf())));
        }
        match fallback {
            Some(path) if path.exists() => Ok((Self::load(&path)?, ConfigSource::File(path))),
            other => Ok((Self::default(), ConfigSource::Defaults(other))),
        }
    }

    /// Parse without validating
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| StripError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Save the configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StripError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        std::fs::write(path, self.to_toml()?).map_err(|e| {
            StripError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Reject settings no driver or show can work with
    pub fn validate(&self) -> Result<()> {
        check_topic_level("sys_name", &self.sys_name)?;
        check_topic_level("control.prefix", &self.control.prefix)?;

        if self.strip.num_leds == 0 {
            return Err(StripError::InvalidConfiguration(
                "strip.num_leds must be at least 1".to_string(),
            ));
        }
        check_unit("strip.initial_brightness", self.strip.initial_brightness)?;
        check_unit("strip.max_global_brightness", self.strip.max_global_brightness)?;

        if self.shows.refresh_interval_ms == 0 {
            return Err(StripError::InvalidConfiguration(
                "shows.refresh_interval_ms must be positive".to_string(),
            ));
        }
        if self.shows.fallback_show.is_empty() {
            return Err(StripError::InvalidConfiguration(
                "shows.fallback_show must name a show".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_topic_level(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(StripError::InvalidConfiguration(format!(
            "{} must not be empty",
            field
        )));
    }
    if value.contains(['/', '+', '#']) {
        return Err(StripError::InvalidConfiguration(format!(
            "{} must be a single topic level without wildcards (got {:?})",
            field, value
        )));
    }
    Ok(())
}

fn check_unit(field: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(StripError::InvalidConfiguration(format!(
            "{} must be between 0.0 and 1.0 (got {})",
            field, value
        )))
    }
}
