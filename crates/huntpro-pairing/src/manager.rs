// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The device manager: registry, discovery, pairing, and the paired-device table.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use huntpro_adapters::{BluetoothDetails, builtin_adapters};
use huntpro_config::{DevicesConfig, HuntConfig};
use huntpro_core::{
    DEFAULT_PAIRING_TIMEOUT, DeviceAdapter, DeviceIdentity, DeviceType, PairedDevice, PairingError, PairingRequest,
    SessionHandle,
};
use huntpro_plugin::{
    AdapterRegistry, DiscoveryReport, ManifestDirSource, PluginDiagnostic, PluginLoader, PluginSource,
    RegistryEntry,
};
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::coordinator::PairingCoordinator;

type PairedTable = Arc<Mutex<BTreeMap<String, PairedDevice>>>;

/// Constructor-time behaviour of a [`DeviceManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerOptions {
    /// Run plugin discovery during construction.
    pub auto_load_plugins: bool,
    /// Deadline given to requests built with [`DeviceManager::request`].
    pub default_timeout: Duration,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            auto_load_plugins: true,
            default_timeout: DEFAULT_PAIRING_TIMEOUT,
        }
    }
}

impl ManagerOptions {
    pub fn from_config(devices: &DevicesConfig) -> Self {
        Self {
            auto_load_plugins: devices.auto_load_plugins,
            default_timeout: devices.pairing_timeout(),
        }
    }
}

/// Discovery state shared with background reloads.
#[derive(Clone)]
struct Discovery {
    loader: PluginLoader,
    registry: Arc<AdapterRegistry>,
    last_diagnostics: Arc<Mutex<Vec<PluginDiagnostic>>>,
}

impl Discovery {
    /// Discover, rebuild the registry from scratch, and record diagnostics.
    fn run(&self) -> DiscoveryReport {
        let mut report = self.loader.discover();
        let ignored = self.registry.rebuild(&report.contributions);
        report.diagnostics.extend(ignored);
        *self.last_diagnostics.lock().unwrap_or_else(|e| e.into_inner()) = report.diagnostics.clone();
        report
    }
}

/// Owns the adapter registry and the devices paired through it.
///
/// Replaces a process-wide singleton: construct one explicitly and pass it
/// to whatever needs device access.
pub struct DeviceManager {
    options: ManagerOptions,
    discovery: Discovery,
    coordinator: PairingCoordinator,
    paired: PairedTable,
    watchers: TaskTracker,
    shutdown: CancellationToken,
    bootstrap: tokio::sync::Mutex<()>,
}

impl DeviceManager {
    pub fn new(
        options: ManagerOptions,
        builtins: Vec<Arc<dyn DeviceAdapter>>,
        source: Arc<dyn PluginSource>,
    ) -> Self {
        let registry = Arc::new(AdapterRegistry::new(builtins));
        let manager = Self {
            options,
            discovery: Discovery {
                loader: PluginLoader::new(source),
                registry: Arc::clone(&registry),
                last_diagnostics: Arc::new(Mutex::new(Vec::new())),
            },
            coordinator: PairingCoordinator::new(registry),
            paired: Arc::new(Mutex::new(BTreeMap::new())),
            watchers: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            bootstrap: tokio::sync::Mutex::new(()),
        };
        if options.auto_load_plugins {
            manager.load_adapter_plugins();
        }
        manager
    }

    /// Manager with the configured built-in adapters and `source` for plugins.
    pub fn from_config(config: &HuntConfig, source: Arc<dyn PluginSource>) -> Self {
        Self::new(
            ManagerOptions::from_config(&config.devices),
            builtin_adapters(&config.adapters),
            source,
        )
    }

    /// Plugin source scanning the configured plugin directory.
    pub fn manifest_source(config: &HuntConfig) -> ManifestDirSource {
        ManifestDirSource::new(&config.devices.plugin_dir)
    }

    pub fn options(&self) -> ManagerOptions {
        self.options
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.discovery.registry
    }

    pub fn coordinator(&self) -> &PairingCoordinator {
        &self.coordinator
    }

    /// Re-run discovery and rebuild the registry from the built-ins up.
    ///
    /// Idempotent: the same installed plugins always produce the same mapping.
    pub fn load_adapter_plugins(&self) -> DiscoveryReport {
        self.discovery.run()
    }

    /// Run discovery on the blocking pool. Readers keep the previous mapping
    /// until the new one is swapped in.
    pub fn load_adapter_plugins_in_background(&self) -> JoinHandle<DiscoveryReport> {
        let discovery = self.discovery.clone();
        tokio::task::spawn_blocking(move || discovery.run())
    }

    /// Diagnostics recorded by the most recent discovery run.
    pub fn last_diagnostics(&self) -> Vec<PluginDiagnostic> {
        self.discovery
            .last_diagnostics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn registry_summary(&self) -> Vec<RegistryEntry> {
        self.discovery.registry.snapshot().summary()
    }

    /// A request carrying this manager's default deadline.
    pub fn request(&self, device_type: DeviceType, identity: DeviceIdentity) -> PairingRequest {
        PairingRequest::new(device_type, identity).with_timeout(self.options.default_timeout)
    }

    fn table(&self) -> MutexGuard<'_, BTreeMap<String, PairedDevice>> {
        self.paired.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Pair a device and record it.
    ///
    /// Re-pairing a device that is already paired closes the old session and
    /// replaces its entry. The entry disappears on its own once the session
    /// ends.
    pub async fn pair(&self, request: PairingRequest) -> Result<PairedDevice, PairingError> {
        let device = self.coordinator.pair(request).await?;

        let previous = self.table().insert(device.device_id.clone(), device.clone());
        if let Some(previous) = previous.filter(|p| p.session != device.session) {
            previous.session.close();
        }

        info!(
            device = device.label().as_str(),
            device_id = device.device_id.as_str(),
            device_type = %device.device_type,
            address = device.address.as_str(),
            event = "Paired",
            status = "OK",
            "hardware event"
        );
        self.watch_session(&device);
        Ok(device)
    }

    /// Paired devices, optionally restricted to one category, ordered by id.
    pub fn paired_devices(&self, device_type: Option<DeviceType>) -> Vec<PairedDevice> {
        self.table()
            .values()
            .filter(|d| device_type.is_none_or(|t| d.device_type == t))
            .cloned()
            .collect()
    }

    /// Case-insensitive lookup.
    pub fn device(&self, device_id: &str) -> Option<PairedDevice> {
        self.table().get(&device_id.to_lowercase()).cloned()
    }

    /// Remove a device and close its session.
    pub fn unpair(&self, device_id: &str) -> Option<PairedDevice> {
        let device = self.table().remove(&device_id.to_lowercase())?;
        device.session.close();
        info!(
            device = device.label().as_str(),
            device_id = device.device_id.as_str(),
            device_type = %device.device_type,
            address = device.address.as_str(),
            event = "Unpaired",
            status = "OK",
            "hardware event"
        );
        Some(device)
    }

    /// Pair a deterministic set of simulated devices if nothing is paired yet.
    ///
    /// Returns the devices paired by this call; empty when devices were
    /// already present. Concurrent callers are serialized, so only the first
    /// one pairs.
    pub async fn ensure_simulated_devices(&self) -> Result<Vec<PairedDevice>, PairingError> {
        let _bootstrap = self.bootstrap.lock().await;
        if !self.table().is_empty() {
            return Ok(Vec::new());
        }
        let mut paired = Vec::new();
        for request in self.simulated_requests() {
            paired.push(self.pair(request).await?);
        }
        Ok(paired)
    }

    /// Stop watching paired sessions and wait for the watchers to exit.
    ///
    /// Sessions stay open; only the manager's bookkeeping stops.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.watchers.close();
        self.watchers.wait().await;
    }

    /// Drop the table entry once its session ends, unless it was already replaced.
    fn watch_session(&self, device: &PairedDevice) {
        let table = Arc::downgrade(&self.paired);
        let shutdown = self.shutdown.clone();
        let session = device.session.clone();
        let device_id = device.device_id.clone();
        let label = device.label();
        self.watchers.spawn(async move {
            tokio::select! {
                () = session.ended() => {}
                () = shutdown.cancelled() => {
                    debug!(device_id = device_id.as_str(), "session watcher stopped");
                    return;
                }
            }
            forget_ended_session(&table, &device_id, &label, &session);
        });
    }

    fn simulated_requests(&self) -> Vec<PairingRequest> {
        let bluetooth = |address: &str, service: &str, rssi: i32| {
            BluetoothDetails::new(address)
                .with_services([service])
                .with_rssi(rssi)
                .into_params()
        };

        let mut rangefinder = self
            .request(
                DeviceType::Rangefinder,
                DeviceIdentity::new("HuntPro", "XR-1200", "SIM-RNG-001").with_firmware("1.2.3"),
            )
            .with_metadata("max_range", 1200)
            .with_metadata("calibration", "factory")
            .with_metadata("simulated", true);
        rangefinder.connection_params = bluetooth("00:11:22:33:44:55", "huntpro.rangefinder", -68);

        let mut weather = self
            .request(
                DeviceType::WeatherMeter,
                DeviceIdentity::new("SkyWise", "WX-Pro", "SIM-WTH-002").with_firmware("4.1.0"),
            )
            .with_metadata(
                "sensors",
                json!(["temperature", "humidity", "wind_speed", "wind_direction"]),
            )
            .with_metadata("calibration", "factory")
            .with_metadata("simulated", true);
        weather.connection_params = bluetooth("00:11:22:33:44:66", "huntpro.weather", -72);

        let mut shot_timer = self
            .request(
                DeviceType::ShotTimer,
                DeviceIdentity::new("ShotSense", "Echo", "SIM-SHT-003").with_firmware("2.0.1"),
            )
            .with_metadata("min_split_ms", 60)
            .with_metadata("sensitivity_db", 85)
            .with_metadata("supports_strings", true)
            .with_metadata("calibration", "factory")
            .with_metadata("simulated", true);
        shot_timer.connection_params = bluetooth("00:11:22:33:44:77", "huntpro.shot_timer", -75);

        vec![rangefinder, weather, shot_timer]
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.watchers.close();
    }
}

fn forget_ended_session(
    table: &Weak<Mutex<BTreeMap<String, PairedDevice>>>,
    device_id: &str,
    label: &str,
    session: &SessionHandle,
) {
    let Some(table) = table.upgrade() else {
        return;
    };
    let mut table = table.lock().unwrap_or_else(|e| e.into_inner());
    let current = table.get(device_id).is_some_and(|d| &d.session == session);
    if current {
        table.remove(device_id);
        if session.is_lost() {
            info!(
                device = label,
                device_id,
                event = "ConnectionLost",
                status = "LOST",
                "hardware event"
            );
        }
    }
}
