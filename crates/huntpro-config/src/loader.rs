// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./huntpro.toml` > `~/.config/huntpro/huntpro.toml` > `/etc/huntpro/huntpro.toml`
//! with environment variable overrides via `HUNTPRO_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::HuntConfig;

/// System-wide config file location.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/huntpro/huntpro.toml";

/// Local config file name, looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "huntpro.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/huntpro/huntpro.toml` (system-wide)
/// 3. `~/.config/huntpro/huntpro.toml` (user XDG config)
/// 4. `./huntpro.toml` (local directory)
/// 5. `HUNTPRO_*` environment variables
pub fn load_config() -> Result<HuntConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<HuntConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HuntConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<HuntConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HuntConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(HuntConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("huntpro").join(LOCAL_CONFIG_FILE))
                .unwrap_or_default(),
        ))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `HUNTPRO_DEVICES_AUTO_LOAD_PLUGINS` must map to
/// `devices.auto_load_plugins`, and `HUNTPRO_ADAPTERS_SHOT_TIMER_MINIMUM_RSSI`
/// to `adapters.shot_timer.minimum_rssi`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("HUNTPRO_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name onto a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    const ADAPTER_SECTIONS: [&str; 3] = ["rangefinder", "weather_meter", "shot_timer"];

    if let Some(rest) = key.strip_prefix("adapters_") {
        for section in ADAPTER_SECTIONS {
            if let Some(field) = rest.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
                return format!("adapters.{section}.{field}");
            }
        }
        return format!("adapters.{rest}");
    }

    key.replacen("devices_", "devices.", 1)
        .replacen("logging_", "logging.", 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("devices_auto_load_plugins"), "devices.auto_load_plugins");
        assert_eq!(map_env_key("logging_level"), "logging.level");
        assert_eq!(
            map_env_key("adapters_shot_timer_minimum_rssi"),
            "adapters.shot_timer.minimum_rssi"
        );
        assert_eq!(
            map_env_key("adapters_weather_meter_required_services"),
            "adapters.weather_meter.required_services"
        );
    }
}
