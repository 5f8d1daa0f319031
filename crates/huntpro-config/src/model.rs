// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Hunt Pro device subsystem.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Hunt Pro configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HuntConfig {
    /// Device manager behavior: plugin discovery and pairing deadlines.
    #[serde(default)]
    pub devices: DevicesConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Tuning for the built-in Bluetooth adapters.
    #[serde(default)]
    pub adapters: AdaptersConfig,
}

/// Device manager configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DevicesConfig {
    /// Run plugin discovery when the device manager is constructed.
    #[serde(default = "default_auto_load_plugins")]
    pub auto_load_plugins: bool,

    /// Deadline applied to pairing requests, in milliseconds.
    #[serde(default = "default_pairing_timeout_ms")]
    pub pairing_timeout_ms: u64,

    /// Directory scanned for `*/plugin.toml` package manifests.
    #[serde(default = "default_plugin_dir")]
    pub plugin_dir: String,
}

impl DevicesConfig {
    pub fn pairing_timeout(&self) -> Duration {
        Duration::from_millis(self.pairing_timeout_ms)
    }
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            auto_load_plugins: default_auto_load_plugins(),
            pairing_timeout_ms: default_pairing_timeout_ms(),
            plugin_dir: default_plugin_dir(),
        }
    }
}

fn default_auto_load_plugins() -> bool {
    true
}

fn default_pairing_timeout_ms() -> u64 {
    10_000
}

fn default_plugin_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("huntpro").join("plugins"))
        .unwrap_or_else(|| std::path::PathBuf::from("./plugins"))
        .display()
        .to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Per-adapter tuning for the built-in Bluetooth adapters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdaptersConfig {
    #[serde(default = "BluetoothAdapterConfig::rangefinder")]
    pub rangefinder: BluetoothAdapterConfig,

    #[serde(default = "BluetoothAdapterConfig::weather_meter")]
    pub weather_meter: BluetoothAdapterConfig,

    #[serde(default = "BluetoothAdapterConfig::shot_timer")]
    pub shot_timer: BluetoothAdapterConfig,
}

impl Default for AdaptersConfig {
    fn default() -> Self {
        Self {
            rangefinder: BluetoothAdapterConfig::rangefinder(),
            weather_meter: BluetoothAdapterConfig::weather_meter(),
            shot_timer: BluetoothAdapterConfig::shot_timer(),
        }
    }
}

/// Connection requirements a Bluetooth adapter enforces before pairing.
///
/// Section-level defaults come from the enclosing [`AdaptersConfig`]; a
/// partially specified section keeps the generic defaults below for the
/// omitted keys.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BluetoothAdapterConfig {
    /// Weakest acceptable RSSI in dBm.
    #[serde(default = "default_minimum_rssi")]
    pub minimum_rssi: i32,

    /// GATT services the advertisement must expose.
    #[serde(default)]
    pub required_services: Vec<String>,
}

impl BluetoothAdapterConfig {
    pub fn new(minimum_rssi: i32, services: &[&str]) -> Self {
        Self {
            minimum_rssi,
            required_services: services.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn rangefinder() -> Self {
        Self::new(-85, &["huntpro.rangefinder"])
    }

    pub fn weather_meter() -> Self {
        Self::new(-92, &["huntpro.weather"])
    }

    pub fn shot_timer() -> Self {
        Self::new(-88, &["huntpro.shot_timer"])
    }
}

fn default_minimum_rssi() -> i32 {
    -90
}
