//! LaserKit Settings Crate
//!
//! Handles application configuration and its persistence.

pub mod config;
pub mod error;

pub use config::{
    Config, ConfigFormat, ConnectionSettings, DeviceSettings, DisplaySettings, FeedRateUnits,
    SimulationSettings, StreamSettings,
};
pub use error::{SettingsError, SettingsResult};
