// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end device manager tests: discovery, override resolution, and pairing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use huntpro_adapters::{RangefinderAdapter, builtin_adapters};
use huntpro_config::{AdaptersConfig, HuntConfig};
use huntpro_core::{DeviceAdapter, DeviceType, DiscoveryIssue, PairingError};
use huntpro_pairing::{DeviceManager, ManagerOptions};
use huntpro_plugin::{AdapterContribution, AdapterOrigin, PLUGIN_API_VERSION, PluginSource, StaticSource};
use huntpro_test_utils::fixtures::{
    bluetooth_request, descriptor, entry, failing_descriptor, identity, panicking_descriptor, source,
};
use huntpro_test_utils::{BlockingAdapter, CountingFactory, HangingAdapter, StubAdapter};
use tracing_test::traced_test;

fn builtins() -> Vec<Arc<dyn DeviceAdapter>> {
    builtin_adapters(&AdaptersConfig::default())
}

fn manager(source: Arc<dyn PluginSource>) -> DeviceManager {
    DeviceManager::new(ManagerOptions::default(), builtins(), source)
}

fn deferred() -> ManagerOptions {
    ManagerOptions {
        auto_load_plugins: false,
        ..ManagerOptions::default()
    }
}

fn manager_without_plugins(adapters: Vec<Arc<dyn DeviceAdapter>>) -> DeviceManager {
    DeviceManager::new(deferred(), adapters, Arc::new(StaticSource::empty()))
}

fn replacing(adapter: impl DeviceAdapter) -> AdapterContribution {
    AdapterContribution::replacing(Arc::new(adapter))
}

fn bare(adapter: impl DeviceAdapter) -> AdapterContribution {
    AdapterContribution::new(Arc::new(adapter))
}

#[tokio::test]
async fn acme_plugin_overrides_builtin_rangefinder() {
    let acme = StubAdapter::new("acme-rangefinder", DeviceType::Rangefinder).with_metadata("vendor_profile", "acme");
    let manager = manager(source(vec![descriptor("acme", vec![replacing(acme.clone())])]));

    let handle = manager.registry().resolve(DeviceType::Rangefinder).unwrap();
    assert_eq!(handle.name(), "acme-rangefinder");
    assert_eq!(handle.origin(), &AdapterOrigin::Plugin("acme".into()));

    let device = manager
        .pair(bluetooth_request(DeviceType::Rangefinder, "RF-777"))
        .await
        .unwrap();
    assert_eq!(device.metadata["vendor_profile"], "acme");
    assert_eq!(acme.calls(), 1);
}

#[tokio::test]
async fn last_replacing_contribution_wins() {
    let manager = manager(source(vec![
        descriptor("pkg-a", vec![replacing(StubAdapter::new("gps-a", DeviceType::Gps))]),
        descriptor("pkg-b", vec![replacing(StubAdapter::new("gps-b", DeviceType::Gps))]),
    ]));

    let handle = manager.registry().resolve(DeviceType::Gps).unwrap();
    assert_eq!(handle.name(), "gps-b");
    assert_eq!(handle.origin(), &AdapterOrigin::Plugin("pkg-b".into()));
}

#[tokio::test]
async fn failing_factory_is_isolated() {
    let manager = DeviceManager::new(
        deferred(),
        builtins(),
        source(vec![
            descriptor("pkg-a", vec![bare(StubAdapter::new("gps-a", DeviceType::Gps))]),
            failing_descriptor("pkg-broken", "vendor SDK missing"),
            descriptor(
                "pkg-c",
                vec![replacing(StubAdapter::new("acme-rangefinder", DeviceType::Rangefinder))],
            ),
        ]),
    );

    let report = manager.load_adapter_plugins();
    let failures: Vec<_> = report.load_failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].source_id, "pkg-broken");

    assert_eq!(manager.registry().resolve(DeviceType::Gps).unwrap().name(), "gps-a");
    assert_eq!(
        manager.registry().resolve(DeviceType::Rangefinder).unwrap().name(),
        "acme-rangefinder"
    );
    assert_eq!(
        manager.registry().resolve(DeviceType::WeatherMeter).unwrap().origin(),
        &AdapterOrigin::Builtin
    );
}

#[tokio::test]
async fn panicking_factory_does_not_take_down_discovery() {
    let manager = manager(source(vec![
        panicking_descriptor("pkg-panic"),
        descriptor("pkg-gps", vec![bare(StubAdapter::new("gps", DeviceType::Gps))]),
    ]));

    let diagnostics = manager.last_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].source_id, "pkg-panic");
    assert!(matches!(diagnostics[0].issue, DiscoveryIssue::PluginLoadFailure { .. }));
    assert!(manager.registry().resolve(DeviceType::Gps).is_some());
}

#[tokio::test]
async fn incompatible_descriptor_is_never_consulted() {
    let factory = CountingFactory::new(vec![replacing(StubAdapter::new("old-gps", DeviceType::Gps))]);
    let manager = DeviceManager::new(
        ManagerOptions::default(),
        builtins(),
        Arc::new(StaticSource::new(vec![entry(
            factory.descriptor("legacy", "0.9"),
        )])),
    );
    manager.load_adapter_plugins();

    assert_eq!(factory.calls(), 0);
    assert!(manager.registry().resolve(DeviceType::Gps).is_none());
    assert!(
        manager
            .last_diagnostics()
            .iter()
            .all(|d| matches!(d.issue, DiscoveryIssue::IncompatibleApiVersion { .. }))
    );

    let current = CountingFactory::new(vec![bare(StubAdapter::new("gps", DeviceType::Gps))]);
    let manager = DeviceManager::new(
        deferred(),
        builtins(),
        Arc::new(StaticSource::new(vec![entry(
            current.descriptor("current", PLUGIN_API_VERSION),
        )])),
    );
    assert_eq!(current.calls(), 0);
    manager.load_adapter_plugins();
    assert_eq!(current.calls(), 1);
}

#[tokio::test]
async fn rediscovery_is_idempotent() {
    let manager = manager(source(vec![
        descriptor("pkg-a", vec![replacing(StubAdapter::new("gps-a", DeviceType::Gps))]),
        descriptor(
            "pkg-b",
            vec![bare(StubAdapter::new("chrono-b", DeviceType::Chronograph))],
        ),
    ]));

    let first = manager.registry_summary();
    let first_diagnostics = manager.last_diagnostics();
    manager.load_adapter_plugins();
    manager.load_adapter_plugins();

    assert_eq!(manager.registry_summary(), first);
    assert_eq!(manager.last_diagnostics(), first_diagnostics);
    assert_eq!(first.len(), 5);
}

#[tokio::test]
async fn discovery_can_be_deferred() {
    let manager = DeviceManager::new(
        deferred(),
        builtins(),
        source(vec![descriptor("pkg-gps", vec![bare(StubAdapter::new("gps", DeviceType::Gps))])]),
    );
    assert!(manager.registry().resolve(DeviceType::Gps).is_none());

    let report = manager.load_adapter_plugins_in_background().await.unwrap();

    assert_eq!(report.descriptors_loaded, 1);
    assert_eq!(manager.registry().resolve(DeviceType::Gps).unwrap().name(), "gps");
}

#[tokio::test]
#[traced_test]
async fn ignored_contribution_is_reported() {
    let manager = manager(source(vec![descriptor(
        "pkg-shy",
        vec![bare(StubAdapter::new("shy-rangefinder", DeviceType::Rangefinder))],
    )]));

    assert_eq!(
        manager.registry().resolve(DeviceType::Rangefinder).unwrap().name(),
        RangefinderAdapter::NAME
    );
    let diagnostics = manager.last_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].issue,
        DiscoveryIssue::ContributionIgnored {
            device_type: DeviceType::Rangefinder,
            kept: RangefinderAdapter::NAME.into(),
        }
    );
    assert!(logs_contain("pkg-shy"));
    assert!(logs_contain("ignored; keeping"));
}

#[tokio::test]
async fn unsupported_type_returns_typed_error() {
    let manager = manager(Arc::new(StaticSource::empty()));
    let err = manager
        .pair(bluetooth_request(DeviceType::Chronograph, "C-1"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PairingError::UnsupportedDeviceType {
            device_type: DeviceType::Chronograph
        }
    );
    assert!(manager.paired_devices(None).is_empty());
}

#[tokio::test]
async fn hanging_adapter_times_out_near_deadline() {
    let hanging = HangingAdapter::new(DeviceType::Gps);
    let manager = manager_without_plugins(vec![Arc::new(hanging.clone())]);
    let request = bluetooth_request(DeviceType::Gps, "G-1").with_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let err = manager.pair(request).await.unwrap_err();
    let elapsed = started.elapsed();

    assert_eq!(
        err,
        PairingError::PairingTimeout {
            device_type: DeviceType::Gps,
            timeout_ms: 200
        }
    );
    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(1000), "{elapsed:?}");
    assert!(manager.paired_devices(None).is_empty());
}

#[tokio::test]
async fn blocking_adapter_cannot_hold_caller_past_deadline() {
    let manager = manager_without_plugins(vec![Arc::new(BlockingAdapter::new(
        DeviceType::Chronograph,
        Duration::from_millis(1500),
    ))]);
    let request = bluetooth_request(DeviceType::Chronograph, "C-2").with_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let err = manager.pair(request).await.unwrap_err();

    assert_eq!(err.kind(), "pairing_timeout");
    assert!(started.elapsed() < Duration::from_millis(1200), "{:?}", started.elapsed());
    assert!(manager.paired_devices(None).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_adapter_times_out_on_multi_thread_runtime() {
    let manager = manager_without_plugins(vec![Arc::new(BlockingAdapter::new(
        DeviceType::Chronograph,
        Duration::from_millis(1500),
    ))]);
    let request = bluetooth_request(DeviceType::Chronograph, "C-3").with_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let err = manager.pair(request).await.unwrap_err();

    assert_eq!(err.kind(), "pairing_timeout");
    assert!(started.elapsed() < Duration::from_millis(1200), "{:?}", started.elapsed());
}

#[tokio::test]
async fn second_request_for_busy_type_is_rejected() {
    let hanging = HangingAdapter::new(DeviceType::Gps);
    let manager = Arc::new(manager_without_plugins(vec![
        Arc::new(hanging.clone()),
        Arc::new(StubAdapter::new("chrono", DeviceType::Chronograph)),
    ]));

    let first = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            manager
                .pair(bluetooth_request(DeviceType::Gps, "G-1").with_timeout(Duration::from_millis(300)))
                .await
        })
    };
    while hanging.started() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let err = manager
        .pair(bluetooth_request(DeviceType::Gps, "G-2"))
        .await
        .unwrap_err();
    assert_eq!(err, PairingError::DeviceBusy { device_type: DeviceType::Gps });

    // Other types proceed in parallel.
    manager
        .pair(bluetooth_request(DeviceType::Chronograph, "C-1"))
        .await
        .unwrap();

    let first = first.await.unwrap().unwrap_err();
    assert_eq!(first.kind(), "pairing_timeout");
    assert_eq!(hanging.started(), 1);
}

#[tokio::test]
async fn paired_devices_are_tracked_and_unpaired() {
    let manager = manager(Arc::new(StaticSource::empty()));
    let request = bluetooth_request(DeviceType::ShotTimer, "ST-007")
        .with_metadata("min_split_ms", 60)
        .with_metadata("sensitivity_db", 95);

    let device = manager.pair(request).await.unwrap();

    assert_eq!(device.device_id, "huntpro:fieldunit:st-007");
    let found = manager.device("HuntPro:FieldUnit:ST-007").unwrap();
    assert_eq!(found.session, device.session);
    assert_eq!(manager.paired_devices(Some(DeviceType::ShotTimer)).len(), 1);
    assert!(manager.paired_devices(Some(DeviceType::Rangefinder)).is_empty());

    let removed = manager.unpair(&device.device_id).unwrap();
    assert!(!removed.session.is_active());
    assert!(manager.device(&device.device_id).is_none());
    assert!(manager.unpair(&device.device_id).is_none());
}

#[tokio::test]
async fn repairing_replaces_entry_and_closes_old_session() {
    let manager = manager_without_plugins(vec![Arc::new(StubAdapter::new("gps", DeviceType::Gps))]);

    let first = manager.pair(bluetooth_request(DeviceType::Gps, "G-9")).await.unwrap();
    let second = manager.pair(bluetooth_request(DeviceType::Gps, "G-9")).await.unwrap();

    assert!(!first.session.is_active());
    assert!(second.session.is_active());
    assert_eq!(manager.paired_devices(None).len(), 1);

    // The old session's watcher must not evict the new entry.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(manager.device(&second.device_id).unwrap().session, second.session);
}

#[tokio::test]
async fn lost_session_removes_device() {
    let manager = manager_without_plugins(vec![Arc::new(StubAdapter::new("gps", DeviceType::Gps))]);
    let device = manager.pair(bluetooth_request(DeviceType::Gps, "G-3")).await.unwrap();

    device.session.mark_lost();

    for _ in 0..100 {
        if manager.device(&device.device_id).is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(manager.device(&device.device_id).is_none());
}

#[tokio::test]
async fn simulated_devices_are_provisioned_once() {
    let manager = manager(Arc::new(StaticSource::empty()));

    let paired = manager.ensure_simulated_devices().await.unwrap();
    assert_eq!(paired.len(), 3);
    assert!(paired.iter().all(|d| d.metadata["simulated"] == true));

    let again = manager.ensure_simulated_devices().await.unwrap();
    assert!(again.is_empty());
    assert_eq!(manager.paired_devices(None).len(), 3);
    assert!(manager.device("huntpro:xr-1200:sim-rng-001").is_some());
}

#[tokio::test]
async fn concurrent_simulated_provisioning_pairs_once() {
    let manager = manager(Arc::new(StaticSource::empty()));

    let (first, second) = tokio::join!(manager.ensure_simulated_devices(), manager.ensure_simulated_devices());

    let mut counts = vec![first.unwrap().len(), second.unwrap().len()];
    counts.sort();
    assert_eq!(counts, vec![0, 3]);
    assert_eq!(manager.paired_devices(None).len(), 3);
}

#[tokio::test]
async fn shutdown_stops_session_watchers_without_closing_sessions() {
    let manager = manager_without_plugins(vec![Arc::new(StubAdapter::new("gps", DeviceType::Gps))]);
    let device = manager.pair(bluetooth_request(DeviceType::Gps, "G-4")).await.unwrap();

    tokio::time::timeout(Duration::from_secs(1), manager.shutdown())
        .await
        .expect("watchers should exit on shutdown");

    assert!(device.session.is_active());
    assert!(manager.device(&device.device_id).is_some());
}

#[tokio::test]
async fn manager_from_config_uses_configured_timeout() {
    let mut config = HuntConfig::default();
    config.devices.auto_load_plugins = false;
    config.devices.pairing_timeout_ms = 1234;

    let manager = DeviceManager::from_config(&config, Arc::new(StaticSource::empty()));

    assert!(!manager.options().auto_load_plugins);
    let request = manager.request(DeviceType::Gps, identity("X"));
    assert_eq!(request.timeout, Duration::from_millis(1234));
    assert_eq!(manager.registry_summary().len(), 3);
}
