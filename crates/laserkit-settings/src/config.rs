//! Configuration file handling for LaserKit
//!
//! Supports JSON and TOML files, chosen by extension. Every section and field
//! has a default, so a file only needs the values it overrides.
//!
//! Configuration is organized into logical sections:
//! - Connection settings (baud rate, handshake and poll timeouts)
//! - Stream settings (in-flight window, worker back-off)
//! - Simulation settings (tick, acceleration, default feeds)
//! - Device settings (setup lines pushed after identification)
//! - Display preferences

pub use laserkit_core::units::FeedRateUnits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{SettingsError, SettingsResult};

/// Directory name under the platform config directory
pub const APP_DIR_NAME: &str = "laserkit";
/// Default config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// File formats understood by [`Config::load_from_file`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Self::Toml),
            other => Err(SettingsError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

/// Serial connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Baud rate for serial connections
    pub baud_rate: u32,
    /// Budget for the identification handshake and each setup reply
    pub handshake_timeout_ms: u64,
    /// Read timeout while streaming
    pub poll_timeout_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            handshake_timeout_ms: 1000,
            poll_timeout_ms: 10,
        }
    }
}

/// Streaming settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Lines the device may hold unacknowledged
    pub window_limit: usize,
    /// Worker sleep after an idle iteration
    pub idle_backoff_ms: u64,
    /// Bytes requested per read
    pub read_chunk: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            window_limit: 200,
            idle_backoff_ms: 5,
            read_chunk: 1024,
        }
    }
}

/// Simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Sampling interval in seconds
    pub tick_seconds: f64,
    /// Fixed acceleration in mm/s²; unset means "reach speed in one second"
    pub acceleration: Option<f64>,
    /// Feed used for G0 moves, mm/min
    pub rapid_feed: f64,
    /// Feed used when a program never sets F, mm/min
    pub default_feed: f64,
    /// New moves replace pending ones instead of queueing behind them
    pub preempt: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_seconds: 1.0 / 60.0,
            acceleration: None,
            rapid_feed: 6000.0,
            default_feed: 1000.0,
            preempt: false,
        }
    }
}

/// Device settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Setup lines pushed after identification; unset uses the built-in list
    pub setup_commands: Option<Vec<String>>,
}

/// Display preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Units for printed feed rates
    pub feed_rate_units: FeedRateUnits,
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionSettings,
    pub stream: StreamSettings,
    pub simulation: SimulationSettings,
    pub device: DeviceSettings,
    pub display: DisplaySettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform config file location (`<config dir>/laserkit/config.toml`)
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("No config directory on this platform".to_string())
            })
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = match format {
            ConfigFormat::Json => serde_json::from_str(&content)?,
            ConfigFormat::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if it exists, otherwise the defaults
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!("No config at {}; using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;
        let format = ConfigFormat::from_path(path)?;

        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| SettingsError::ConfigDirectory(format!("{}: {}", parent.display(), e)))?;
        }
        std::fs::write(path, content)?;

        debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.connection.baud_rate == 0 {
            return Err(SettingsError::invalid("connection.baud_rate", "must be > 0"));
        }
        if self.connection.handshake_timeout_ms == 0 {
            return Err(SettingsError::invalid(
                "connection.handshake_timeout_ms",
                "must be > 0",
            ));
        }
        if self.connection.poll_timeout_ms == 0 {
            return Err(SettingsError::invalid(
                "connection.poll_timeout_ms",
                "must be > 0",
            ));
        }

        if self.stream.window_limit == 0 {
            return Err(SettingsError::invalid("stream.window_limit", "must be > 0"));
        }
        if self.stream.read_chunk == 0 {
            return Err(SettingsError::invalid("stream.read_chunk", "must be > 0"));
        }

        check_positive("simulation.tick_seconds", self.simulation.tick_seconds)?;
        if let Some(acceleration) = self.simulation.acceleration {
            check_positive("simulation.acceleration", acceleration)?;
        }
        check_positive("simulation.rapid_feed", self.simulation.rapid_feed)?;
        check_positive("simulation.default_feed", self.simulation.default_feed)?;

        if let Some(commands) = &self.device.setup_commands {
            if let Some(bad) = commands
                .iter()
                .find(|c| c.trim().is_empty() || c.contains(['\n', '\r']))
            {
                return Err(SettingsError::invalid(
                    "device.setup_commands",
                    format!("{:?} must be a single non-empty line", bad),
                ));
            }
        }

        Ok(())
    }
}

fn check_positive(key: &str, value: f64) -> SettingsResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SettingsError::invalid(key, format!("{} must be finite and > 0", value)))
    }
}
