// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter registry: the authoritative `DeviceType -> adapter` mapping.
//!
//! Readers take an immutable [`RegistrySnapshot`] and never block. Writers go
//! through a single writer section, build a new snapshot, and swap it in with
//! `arc-swap`, so a reader sees either the old mapping or the new one, never a
//! partially applied merge.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use huntpro_core::{DeviceAdapter, DeviceType, DiscoveryIssue};
use serde::Serialize;
use tracing::{info, warn};

use crate::descriptor::AdapterContribution;
use crate::loader::{PluginDiagnostic, SourcedContribution};

/// Where an installed adapter came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "source_id", rename_all = "snake_case")]
pub enum AdapterOrigin {
    Builtin,
    Plugin(String),
}

impl fmt::Display for AdapterOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterOrigin::Builtin => write!(f, "built-in"),
            AdapterOrigin::Plugin(source_id) => write!(f, "plugin:{source_id}"),
        }
    }
}

/// Shared reference to an installed adapter.
#[derive(Clone)]
pub struct AdapterHandle {
    adapter: Arc<dyn DeviceAdapter>,
    origin: AdapterOrigin,
}

impl AdapterHandle {
    pub fn new(adapter: Arc<dyn DeviceAdapter>, origin: AdapterOrigin) -> Self {
        Self { adapter, origin }
    }

    pub fn adapter(&self) -> &Arc<dyn DeviceAdapter> {
        &self.adapter
    }

    pub fn name(&self) -> &str {
        self.adapter.name()
    }

    pub fn device_type(&self) -> DeviceType {
        self.adapter.device_type()
    }

    pub fn origin(&self) -> &AdapterOrigin {
        &self.origin
    }

    /// True when both handles point at the same adapter instance.
    pub fn same_adapter(&self, other: &AdapterHandle) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.adapter), Arc::as_ptr(&other.adapter))
    }
}

impl fmt::Debug for AdapterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterHandle")
            .field("name", &self.adapter.name())
            .field("device_type", &self.adapter.device_type())
            .field("origin", &self.origin)
            .finish()
    }
}

/// Result of applying one contribution to a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The device type had no adapter; the contribution now fills it.
    Installed,
    /// The contribution overrode the named adapter.
    Replaced { previous: String },
    /// The slot was occupied and the contribution did not ask to replace it.
    Ignored { kept: String },
}

/// One row of a registry summary, as plain data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    pub device_type: DeviceType,
    pub adapter: String,
    pub origin: AdapterOrigin,
}

/// Immutable view of the mapping at one point in time.
#[derive(Clone, Default)]
pub struct RegistrySnapshot {
    adapters: BTreeMap<DeviceType, AdapterHandle>,
}

impl RegistrySnapshot {
    pub fn resolve(&self, device_type: DeviceType) -> Option<&AdapterHandle> {
        self.adapters.get(&device_type)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Installed adapters, sorted by device type.
    pub fn entries(&self) -> impl Iterator<Item = (DeviceType, &AdapterHandle)> {
        self.adapters.iter().map(|(device_type, handle)| (*device_type, handle))
    }

    /// Plain-data view of [`entries`](Self::entries).
    pub fn summary(&self) -> Vec<RegistryEntry> {
        self.entries()
            .map(|(device_type, handle)| RegistryEntry {
                device_type,
                adapter: handle.name().to_string(),
                origin: handle.origin.clone(),
            })
            .collect()
    }

    /// Apply the override rule for a single contribution.
    fn apply(&mut self, contribution: AdapterContribution, origin: AdapterOrigin) -> InstallOutcome {
        let device_type = contribution.device_type();
        let handle = AdapterHandle::new(contribution.adapter, origin);
        match self.adapters.get(&device_type) {
            None => {
                self.adapters.insert(device_type, handle);
                InstallOutcome::Installed
            }
            Some(existing) if contribution.replace_existing => {
                let previous = existing.name().to_string();
                self.adapters.insert(device_type, handle);
                InstallOutcome::Replaced { previous }
            }
            Some(existing) => InstallOutcome::Ignored {
                kept: existing.name().to_string(),
            },
        }
    }
}

impl fmt::Debug for RegistrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.adapters.iter()).finish()
    }
}

/// Holds the resolved, conflict-free mapping from device category to adapter.
///
/// Built-in adapters form the default mapping. Contributions are layered on
/// top according to their `replace_existing` flag.
pub struct AdapterRegistry {
    builtins: Vec<Arc<dyn DeviceAdapter>>,
    current: ArcSwap<RegistrySnapshot>,
    writer: Mutex<()>,
}

impl AdapterRegistry {
    /// Create a registry seeded with the given built-in adapters, one per device type.
    pub fn new(builtins: Vec<Arc<dyn DeviceAdapter>>) -> Self {
        let seeded = Self::builtin_snapshot(&builtins);
        Self {
            builtins,
            current: ArcSwap::from_pointee(seeded),
            writer: Mutex::new(()),
        }
    }

    fn builtin_snapshot(builtins: &[Arc<dyn DeviceAdapter>]) -> RegistrySnapshot {
        let mut snapshot = RegistrySnapshot::default();
        for adapter in builtins {
            let name = adapter.name().to_string();
            let device_type = adapter.device_type();
            match snapshot.apply(AdapterContribution::new(Arc::clone(adapter)), AdapterOrigin::Builtin) {
                InstallOutcome::Installed => {
                    info!(device_type = %device_type, adapter = name.as_str(), "registered built-in adapter");
                }
                outcome => {
                    warn!(
                        device_type = %device_type,
                        adapter = name.as_str(),
                        ?outcome,
                        "duplicate built-in adapter ignored"
                    );
                }
            }
        }
        snapshot
    }

    /// Current immutable snapshot. Cheap; never blocks on writers.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.load_full()
    }

    /// Active adapter for `device_type`, if any.
    pub fn resolve(&self, device_type: DeviceType) -> Option<AdapterHandle> {
        self.current.load().resolve(device_type).cloned()
    }

    /// Apply one contribution attributed to the host itself.
    pub fn install(&self, contribution: AdapterContribution) -> InstallOutcome {
        self.install_from(contribution, AdapterOrigin::Builtin)
    }

    /// Apply one contribution with an explicit origin.
    pub fn install_from(&self, contribution: AdapterContribution, origin: AdapterOrigin) -> InstallOutcome {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = RegistrySnapshot::clone(&self.current.load());
        let device_type = contribution.device_type();
        let adapter = contribution.adapter.name().to_string();
        let outcome = next.apply(contribution, origin);
        log_outcome(device_type, &adapter, &outcome);
        self.current.store(Arc::new(next));
        outcome
    }

    /// Drop every contribution and return to the built-in mapping.
    pub fn reset_to_builtin(&self) {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        self.current.store(Arc::new(Self::builtin_snapshot(&self.builtins)));
    }

    /// Build a fresh mapping from the built-ins plus `contributions` (in order)
    /// and swap it in atomically.
    ///
    /// Returns a diagnostic for each contribution the override rule ignored.
    pub fn rebuild(&self, contributions: &[SourcedContribution]) -> Vec<PluginDiagnostic> {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = Self::builtin_snapshot(&self.builtins);
        let mut ignored = Vec::new();

        for sourced in contributions {
            let device_type = sourced.contribution.device_type();
            let adapter = sourced.contribution.adapter.name().to_string();
            let outcome = next.apply(
                sourced.contribution.clone(),
                AdapterOrigin::Plugin(sourced.source_id.clone()),
            );
            match outcome {
                InstallOutcome::Ignored { kept } => {
                    ignored.push(PluginDiagnostic::record(
                        &sourced.source_id,
                        DiscoveryIssue::ContributionIgnored { device_type, kept },
                    ));
                }
                outcome => log_outcome(device_type, &adapter, &outcome),
            }
        }

        self.current.store(Arc::new(next));
        ignored
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("builtins", &self.builtins.len())
            .field("current", &self.current.load())
            .finish()
    }
}

fn log_outcome(device_type: DeviceType, adapter: &str, outcome: &InstallOutcome) {
    match outcome {
        InstallOutcome::Installed => {
            info!(device_type = %device_type, adapter, "registered adapter");
        }
        InstallOutcome::Replaced { previous } => {
            info!(
                device_type = %device_type,
                adapter,
                previous = previous.as_str(),
                "adapter override applied"
            );
        }
        InstallOutcome::Ignored { kept } => {
            warn!(
                device_type = %device_type,
                adapter,
                kept = kept.as_str(),
                "contribution ignored; device type already has an adapter"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use huntpro_core::{PairedDevice, PairingError, PairingRequest};
    use proptest::prelude::*;

    struct Named(String, DeviceType);

    #[async_trait]
    impl DeviceAdapter for Named {
        fn name(&self) -> &str {
            &self.0
        }

        fn device_type(&self) -> DeviceType {
            self.1
        }

        async fn pair(&self, _request: PairingRequest) -> Result<PairedDevice, PairingError> {
            Err(PairingError::rejected(self.0.clone(), "test adapter"))
        }
    }

    fn adapter(name: &str, device_type: DeviceType) -> Arc<dyn DeviceAdapter> {
        Arc::new(Named(name.to_string(), device_type))
    }

    fn sourced(source_id: &str, name: &str, device_type: DeviceType, replace: bool) -> SourcedContribution {
        SourcedContribution {
            source_id: source_id.to_string(),
            contribution: AdapterContribution {
                adapter: adapter(name, device_type),
                replace_existing: replace,
            },
        }
    }

    fn builtin_registry() -> AdapterRegistry {
        AdapterRegistry::new(vec![
            adapter("builtin-rangefinder", DeviceType::Rangefinder),
            adapter("builtin-weather", DeviceType::WeatherMeter),
        ])
    }

    #[test]
    fn builtins_seed_the_mapping() {
        let registry = builtin_registry();
        assert_eq!(registry.snapshot().len(), 2);
        let handle = registry.resolve(DeviceType::Rangefinder).unwrap();
        assert_eq!(handle.name(), "builtin-rangefinder");
        assert_eq!(handle.origin(), &AdapterOrigin::Builtin);
        assert!(registry.resolve(DeviceType::Gps).is_none());

        let snapshot = registry.snapshot();
        let types: Vec<DeviceType> = snapshot.entries().map(|(t, _)| t).collect();
        assert_eq!(types, vec![DeviceType::Rangefinder, DeviceType::WeatherMeter]);
    }

    #[test]
    fn duplicate_builtin_keeps_first() {
        let registry = AdapterRegistry::new(vec![
            adapter("first", DeviceType::ShotTimer),
            adapter("second", DeviceType::ShotTimer),
        ]);
        assert_eq!(registry.snapshot().len(), 1);
        assert_eq!(registry.resolve(DeviceType::ShotTimer).unwrap().name(), "first");
    }

    #[test]
    fn install_follows_override_rule() {
        let registry = builtin_registry();

        let outcome = registry.install(AdapterContribution::new(adapter("gps", DeviceType::Gps)));
        assert_eq!(outcome, InstallOutcome::Installed);

        let outcome = registry.install(AdapterContribution::new(adapter("other", DeviceType::Rangefinder)));
        assert_eq!(
            outcome,
            InstallOutcome::Ignored {
                kept: "builtin-rangefinder".into()
            }
        );

        let outcome = registry.install_from(
            AdapterContribution::replacing(adapter("acme", DeviceType::Rangefinder)),
            AdapterOrigin::Plugin("acme-pkg".into()),
        );
        assert_eq!(
            outcome,
            InstallOutcome::Replaced {
                previous: "builtin-rangefinder".into()
            }
        );
        let handle = registry.resolve(DeviceType::Rangefinder).unwrap();
        assert_eq!(handle.name(), "acme");
        assert_eq!(handle.origin(), &AdapterOrigin::Plugin("acme-pkg".into()));
    }

    #[test]
    fn reset_to_builtin_drops_contributions() {
        let registry = builtin_registry();
        registry.install(AdapterContribution::replacing(adapter("acme", DeviceType::Rangefinder)));
        registry.install(AdapterContribution::new(adapter("gps", DeviceType::Gps)));

        registry.reset_to_builtin();

        assert_eq!(registry.resolve(DeviceType::Rangefinder).unwrap().name(), "builtin-rangefinder");
        assert!(registry.resolve(DeviceType::Gps).is_none());
    }

    #[test]
    fn snapshots_are_isolated_from_later_writes() {
        let registry = builtin_registry();
        let before = registry.snapshot();
        registry.install(AdapterContribution::new(adapter("gps", DeviceType::Gps)));
        assert!(before.resolve(DeviceType::Gps).is_none());
        assert!(registry.snapshot().resolve(DeviceType::Gps).is_some());
    }

    #[test]
    fn rebuild_reports_ignored_contributions() {
        let registry = builtin_registry();
        let diagnostics = registry.rebuild(&[
            sourced("pkg-a", "weather-a", DeviceType::WeatherMeter, false),
            sourced("pkg-b", "gps-b", DeviceType::Gps, false),
        ]);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].source_id, "pkg-a");
        assert_eq!(
            diagnostics[0].issue,
            DiscoveryIssue::ContributionIgnored {
                device_type: DeviceType::WeatherMeter,
                kept: "builtin-weather".into()
            }
        );
        assert_eq!(registry.resolve(DeviceType::Gps).unwrap().name(), "gps-b");
    }

    #[test]
    fn rebuild_is_idempotent() {
        let registry = builtin_registry();
        let contributions = vec![
            sourced("a", "gps-a", DeviceType::Gps, true),
            sourced("b", "gps-b", DeviceType::Gps, true),
            sourced("c", "acme", DeviceType::Rangefinder, true),
        ];
        registry.rebuild(&contributions);
        let first = registry.snapshot().summary();
        registry.rebuild(&contributions);
        assert_eq!(registry.snapshot().summary(), first);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn same_adapter_compares_instances() {
        let shared = adapter("gps", DeviceType::Gps);
        let a = AdapterHandle::new(Arc::clone(&shared), AdapterOrigin::Builtin);
        let b = AdapterHandle::new(shared, AdapterOrigin::Plugin("x".into()));
        let c = AdapterHandle::new(adapter("gps", DeviceType::Gps), AdapterOrigin::Builtin);
        assert!(a.same_adapter(&b));
        assert!(!a.same_adapter(&c));
    }

    fn device_type_strategy() -> impl Strategy<Value = DeviceType> {
        prop_oneof![
            Just(DeviceType::Rangefinder),
            Just(DeviceType::Gps),
            Just(DeviceType::Chronograph),
        ]
    }

    proptest! {
        /// Final adapter per type: the last replacing contribution, else the
        /// built-in, else the first contribution, else nothing.
        #[test]
        fn resolution_rule_holds(
            plan in proptest::collection::vec((device_type_strategy(), any::<bool>()), 0..12)
        ) {
            let registry = AdapterRegistry::new(vec![adapter("builtin", DeviceType::Rangefinder)]);
            let contributions: Vec<SourcedContribution> = plan
                .iter()
                .enumerate()
                .map(|(i, (t, replace))| sourced(&format!("pkg{i}"), &format!("c{i}"), *t, *replace))
                .collect();
            registry.rebuild(&contributions);

            for device_type in [DeviceType::Rangefinder, DeviceType::Gps, DeviceType::Chronograph] {
                let targeting: Vec<(usize, bool)> = plan
                    .iter()
                    .enumerate()
                    .filter(|(_, (t, _))| *t == device_type)
                    .map(|(i, (_, r))| (i, *r))
                    .collect();
                let last_replace = targeting.iter().rev().find(|(_, r)| *r).map(|(i, _)| format!("c{i}"));
                let expected = match last_replace {
                    Some(name) => Some(name),
                    None if device_type == DeviceType::Rangefinder => Some("builtin".to_string()),
                    None => targeting.first().map(|(i, _)| format!("c{i}")),
                };
                let actual = registry.resolve(device_type).map(|h| h.name().to_string());
                prop_assert_eq!(actual, expected);
            }
        }
    }
}
