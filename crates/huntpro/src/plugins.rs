// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter packages linked into this build.
//!
//! Linking alone contributes nothing: a package becomes active once a
//! `plugin.toml` in the plugin directory names its entry point.

use async_trait::async_trait;
use huntpro_adapters::BluetoothLink;
use huntpro_core::{DeviceAdapter, DeviceCapability, DeviceType, PairedDevice, PairingError, PairingRequest};
use huntpro_plugin::{Contributed, ManifestDirSource, PLUGIN_API_VERSION, PluginDescriptor};
use serde_json::Value;

pub const GPS_ENTRY_POINT: &str = "huntpro_gps";
pub const CHRONOGRAPH_ENTRY_POINT: &str = "huntpro_chronograph";

/// Bind every linked package constructor into `source`.
pub fn link_all(source: ManifestDirSource) -> ManifestDirSource {
    source
        .link(GPS_ENTRY_POINT, || Ok(gps_package()))
        .link(CHRONOGRAPH_ENTRY_POINT, || Ok(chronograph_package()))
}

fn gps_package() -> PluginDescriptor {
    PluginDescriptor::new("huntpro-gps", PLUGIN_API_VERSION, || {
        Ok(vec![Contributed::bare(GpsAdapter::default())])
    })
}

fn chronograph_package() -> PluginDescriptor {
    PluginDescriptor::new("huntpro-chronograph", PLUGIN_API_VERSION, || {
        Ok(vec![Contributed::bare(ChronographAdapter::default())])
    })
}

/// Handheld GPS units paired over Bluetooth.
#[derive(Debug, Clone)]
pub struct GpsAdapter {
    link: BluetoothLink,
}

impl GpsAdapter {
    pub const NAME: &'static str = "huntpro-gps";
}

impl Default for GpsAdapter {
    fn default() -> Self {
        Self {
            link: BluetoothLink::new(-85, vec!["huntpro.gps".to_string()]),
        }
    }
}

#[async_trait]
impl DeviceAdapter for GpsAdapter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn device_type(&self) -> DeviceType {
        DeviceType::Gps
    }

    async fn pair(&self, request: PairingRequest) -> Result<PairedDevice, PairingError> {
        let details = self.link.validate(Self::NAME, &request)?;

        let mut device =
            PairedDevice::new(&request, details.address).with_capabilities([DeviceCapability::PositionFix]);
        device
            .metadata
            .entry("datum")
            .or_insert_with(|| Value::from("WGS84"));
        Ok(device)
    }
}

/// Ballistic chronographs; `max_velocity_fps` must be a positive number.
#[derive(Debug, Clone)]
pub struct ChronographAdapter {
    link: BluetoothLink,
}

impl ChronographAdapter {
    pub const NAME: &'static str = "huntpro-chronograph";
}

impl Default for ChronographAdapter {
    fn default() -> Self {
        Self {
            link: BluetoothLink::new(-80, vec!["huntpro.chronograph".to_string()]),
        }
    }
}

#[async_trait]
impl DeviceAdapter for ChronographAdapter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn device_type(&self) -> DeviceType {
        DeviceType::Chronograph
    }

    async fn pair(&self, request: PairingRequest) -> Result<PairedDevice, PairingError> {
        let details = self.link.validate(Self::NAME, &request)?;
        request.require_metadata(Self::NAME, &["max_velocity_fps"])?;

        let max_velocity = request.metadata.get("max_velocity_fps").cloned().unwrap_or_default();
        if !max_velocity.as_f64().is_some_and(|v| v > 0.0) {
            return Err(
                PairingError::rejected(Self::NAME, "chronograph reported invalid max_velocity_fps value")
                    .with_context("max_velocity_fps", max_velocity),
            );
        }

        Ok(PairedDevice::new(&request, details.address).with_capabilities([DeviceCapability::MuzzleVelocity]))
    }
}
