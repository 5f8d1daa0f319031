// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for plugin descriptors, entry points, and pairing requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use huntpro_adapters::BluetoothDetails;
use huntpro_core::{DeviceIdentity, DeviceType, PairingRequest};
use huntpro_plugin::{
    AdapterContribution, Contributed, EntryPoint, PLUGIN_API_VERSION, PluginDescriptor, PluginSource,
    StaticSource,
};

/// Descriptor at the host API version yielding `contributions` in order.
pub fn descriptor(source_id: &str, contributions: Vec<AdapterContribution>) -> PluginDescriptor {
    versioned_descriptor(source_id, PLUGIN_API_VERSION, contributions)
}

pub fn versioned_descriptor(
    source_id: &str,
    api_version: &str,
    contributions: Vec<AdapterContribution>,
) -> PluginDescriptor {
    PluginDescriptor::new(source_id, api_version, move || {
        Ok(contributions.iter().cloned().map(Contributed::from).collect())
    })
}

/// Descriptor whose factory returns an error.
pub fn failing_descriptor(source_id: &str, reason: &str) -> PluginDescriptor {
    let reason = reason.to_string();
    PluginDescriptor::new(source_id, PLUGIN_API_VERSION, move || Err(reason.clone().into()))
}

/// Descriptor whose factory panics.
pub fn panicking_descriptor(source_id: &str) -> PluginDescriptor {
    let message = format!("{source_id} factory exploded");
    PluginDescriptor::new(source_id, PLUGIN_API_VERSION, move || panic!("{message}"))
}

/// Entry point named after the descriptor's source id.
pub fn entry(descriptor: PluginDescriptor) -> EntryPoint {
    EntryPoint::descriptor(descriptor.source_id.clone(), descriptor)
}

/// A plugin source serving `descriptors` in order.
pub fn source(descriptors: Vec<PluginDescriptor>) -> Arc<dyn PluginSource> {
    Arc::new(StaticSource::new(descriptors.into_iter().map(entry).collect()))
}

/// Plugin factory that counts how often it was invoked.
#[derive(Clone, Default)]
pub struct CountingFactory {
    calls: Arc<AtomicUsize>,
    contributions: Vec<AdapterContribution>,
}

impl CountingFactory {
    pub fn new(contributions: Vec<AdapterContribution>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            contributions,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Descriptor wired to this factory, declaring `api_version`.
    pub fn descriptor(&self, source_id: &str, api_version: &str) -> PluginDescriptor {
        let calls = Arc::clone(&self.calls);
        let contributions = self.contributions.clone();
        PluginDescriptor::new(source_id, api_version, move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(contributions.iter().cloned().map(Contributed::from).collect())
        })
    }
}

pub fn identity(serial: &str) -> DeviceIdentity {
    DeviceIdentity::new("HuntPro", "FieldUnit", serial).with_firmware("1.0.0")
}

/// Bluetooth pairing request that satisfies the built-in link checks for `device_type`.
pub fn bluetooth_request(device_type: DeviceType, serial: &str) -> PairingRequest {
    let service = match device_type {
        DeviceType::Rangefinder => "huntpro.rangefinder",
        DeviceType::WeatherMeter => "huntpro.weather",
        DeviceType::ShotTimer => "huntpro.shot_timer",
        DeviceType::Gps => "huntpro.gps",
        DeviceType::Chronograph => "huntpro.chronograph",
    };
    let mut request = PairingRequest::new(device_type, identity(serial));
    request.connection_params = BluetoothDetails::new("01:02:03:04:05:06")
        .with_services([service])
        .with_rssi(-60)
        .into_params();
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StubAdapter;

    #[test]
    fn counting_factory_shares_counter() {
        let factory = CountingFactory::new(vec![AdapterContribution::new(Arc::new(StubAdapter::new(
            "gps",
            DeviceType::Gps,
        )))]);
        let d = factory.descriptor("pkg", PLUGIN_API_VERSION);
        assert_eq!(d.contributions().unwrap().len(), 1);
        assert_eq!(d.contributions().unwrap().len(), 1);
        assert_eq!(factory.calls(), 2);
    }

    #[test]
    fn failing_fixtures_fail() {
        assert!(failing_descriptor("a", "nope").contributions().is_err());
        assert!(panicking_descriptor("b").contributions().is_err());
    }
}
