// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as positive deadlines and plausible RSSI thresholds.

use crate::diagnostic::ConfigError;
use crate::model::{BluetoothAdapterConfig, HuntConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &HuntConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.devices.pairing_timeout_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "devices.pairing_timeout_ms must be greater than 0".to_string(),
        });
    }

    if config.devices.plugin_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "devices.plugin_dir must not be empty".to_string(),
        });
    }

    let level = config.logging.level.trim().to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.level `{}` is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    for (name, adapter) in [
        ("rangefinder", &config.adapters.rangefinder),
        ("weather_meter", &config.adapters.weather_meter),
        ("shot_timer", &config.adapters.shot_timer),
    ] {
        validate_adapter(name, adapter, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_adapter(name: &str, adapter: &BluetoothAdapterConfig, errors: &mut Vec<ConfigError>) {
    if !(-127..=0).contains(&adapter.minimum_rssi) {
        errors.push(ConfigError::Validation {
            message: format!(
                "adapters.{name}.minimum_rssi must be between -127 and 0 dBm, got {}",
                adapter.minimum_rssi
            ),
        });
    }

    if adapter.required_services.iter().any(|s| s.trim().is_empty()) {
        errors.push(ConfigError::Validation {
            message: format!("adapters.{name}.required_services must not contain empty names"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&HuntConfig::default()).is_ok());
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let mut config = HuntConfig::default();
        config.devices.pairing_timeout_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "pairing_timeout_ms"));
    }

    #[test]
    fn positive_rssi_fails_validation() {
        let mut config = HuntConfig::default();
        config.adapters.shot_timer.minimum_rssi = 5;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "adapters.shot_timer.minimum_rssi"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = HuntConfig::default();
        config.devices.pairing_timeout_ms = 0;
        config.logging.level = "loud".to_string();
        config.adapters.weather_meter.required_services = vec![" ".to_string()];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(has_message(&errors, "logging.level `loud`"));
        assert!(has_message(&errors, "weather_meter.required_services"));
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let mut config = HuntConfig::default();
        config.logging.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
