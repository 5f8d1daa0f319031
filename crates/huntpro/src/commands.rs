// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations.
//!
//! Every command prints either aligned text or, with `--json`, the plain
//! structured data the device manager exposes.

use std::time::Duration;

use huntpro_adapters::BluetoothDetails;
use huntpro_core::{DeviceIdentity, DeviceType, HuntError, PairedDevice};
use huntpro_pairing::DeviceManager;
use huntpro_plugin::{PluginDiagnostic, RegistryEntry};
use serde::Serialize;
use serde_json::Value;

/// Arguments of `huntpro pair`.
#[derive(Debug)]
pub struct PairArgs {
    pub device_type: DeviceType,
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub firmware: Option<String>,
    pub address: String,
    pub rssi: Option<i32>,
    pub services: Vec<String>,
    pub metadata: Vec<String>,
    pub timeout_ms: Option<u64>,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), HuntError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| HuntError::Internal(e.to_string()))?;
    println!("{text}");
    Ok(())
}

fn print_registry(entries: &[RegistryEntry]) {
    for entry in entries {
        println!(
            "{:<14} {:<28} {}",
            entry.device_type.to_string(),
            entry.adapter,
            entry.origin
        );
    }
}

fn print_diagnostics(diagnostics: &[PluginDiagnostic]) {
    for d in diagnostics {
        println!("{:<8} {:<24} {}", d.severity.to_string(), d.source_id, d.issue);
    }
}

fn print_device(device: &PairedDevice) {
    let caps: Vec<String> = device.capabilities.iter().map(ToString::to_string).collect();
    println!(
        "{:<36} {:<14} {:<20} {}",
        device.device_id,
        device.device_type.to_string(),
        device.address,
        caps.join(",")
    );
}

/// `huntpro adapters`
pub fn run_adapters(manager: &DeviceManager, json: bool) -> Result<(), HuntError> {
    let summary = manager.registry_summary();
    if json {
        return print_json(&summary);
    }
    print_registry(&summary);
    Ok(())
}

#[derive(Serialize)]
struct PluginsOutput<'a> {
    descriptors_loaded: usize,
    contributions: usize,
    diagnostics: &'a [PluginDiagnostic],
    registry: &'a [RegistryEntry],
}

/// `huntpro plugins`
pub fn run_plugins(manager: &DeviceManager, json: bool) -> Result<(), HuntError> {
    let report = manager.load_adapter_plugins();
    let registry = manager.registry_summary();
    if json {
        return print_json(&PluginsOutput {
            descriptors_loaded: report.descriptors_loaded,
            contributions: report.contributions.len(),
            diagnostics: &report.diagnostics,
            registry: &registry,
        });
    }
    println!(
        "{} plug-in(s) loaded, {} contribution(s), {} diagnostic(s)",
        report.descriptors_loaded,
        report.contributions.len(),
        report.diagnostics.len()
    );
    print_diagnostics(&report.diagnostics);
    print_registry(&registry);
    Ok(())
}

/// Parse `key=value`; the value is JSON when it parses as JSON, a string otherwise.
pub fn parse_metadata(entry: &str) -> Result<(String, Value), HuntError> {
    let (key, raw) = entry
        .split_once('=')
        .ok_or_else(|| HuntError::Config(format!("metadata `{entry}` must be key=value")))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(HuntError::Config(format!("metadata `{entry}` has an empty key")));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// `huntpro pair`
pub async fn run_pair(manager: &DeviceManager, args: PairArgs, json: bool) -> Result<(), HuntError> {
    let mut identity = DeviceIdentity::new(args.manufacturer, args.model, args.serial);
    if let Some(firmware) = args.firmware {
        identity = identity.with_firmware(firmware);
    }

    let mut details = BluetoothDetails::new(args.address).with_services(args.services);
    if let Some(rssi) = args.rssi {
        details = details.with_rssi(rssi);
    }

    let mut request = manager.request(args.device_type, identity);
    request.connection_params = details.into_params();
    for entry in &args.metadata {
        let (key, value) = parse_metadata(entry)?;
        request.metadata.insert(key, value);
    }
    if let Some(ms) = args.timeout_ms {
        request = request.with_timeout(Duration::from_millis(ms));
    }

    let device = manager.pair(request).await?;
    if json {
        return print_json(&device);
    }
    println!("paired {}", device.label());
    print_device(&device);
    Ok(())
}

/// `huntpro simulate`
pub async fn run_simulate(manager: &DeviceManager, json: bool) -> Result<(), HuntError> {
    manager.ensure_simulated_devices().await?;
    let devices = manager.paired_devices(None);
    if json {
        return print_json(&devices);
    }
    for device in &devices {
        print_device(device);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_values_are_json_when_possible() {
        assert_eq!(parse_metadata("max_range=1200").unwrap(), ("max_range".into(), Value::from(1200)));
        assert_eq!(
            parse_metadata("supports_inclination=false").unwrap().1,
            Value::Bool(false)
        );
        assert_eq!(
            parse_metadata("sensors=[\"temperature\",\"pressure\"]").unwrap().1,
            serde_json::json!(["temperature", "pressure"])
        );
        assert_eq!(parse_metadata("calibration=field").unwrap().1, Value::from("field"));
        assert_eq!(parse_metadata("note=a=b").unwrap().1, Value::from("a=b"));
    }

    #[test]
    fn malformed_metadata_is_rejected() {
        assert!(parse_metadata("no-equals").is_err());
        assert!(parse_metadata("=1").is_err());
    }

    #[tokio::test]
    async fn simulate_pairs_three_devices() {
        let config = huntpro_config::load_and_validate_str("[devices]\nauto_load_plugins = false\n").unwrap();
        let manager = DeviceManager::from_config(&config, std::sync::Arc::new(huntpro_plugin::StaticSource::empty()));
        run_simulate(&manager, true).await.unwrap();
        assert_eq!(manager.paired_devices(None).len(), 3);
    }
}
