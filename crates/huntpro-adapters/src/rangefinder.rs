// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use huntpro_config::BluetoothAdapterConfig;
use huntpro_core::{DeviceAdapter, DeviceCapability, DeviceType, PairedDevice, PairingError, PairingRequest};

use crate::bluetooth::BluetoothLink;
use crate::{set_default, truthy};

/// Pairs Bluetooth laser rangefinders.
#[derive(Debug, Clone)]
pub struct RangefinderAdapter {
    link: BluetoothLink,
}

impl RangefinderAdapter {
    pub const NAME: &'static str = "huntpro-rangefinder";

    pub fn new(config: &BluetoothAdapterConfig) -> Self {
        Self {
            link: BluetoothLink::from_config(config),
        }
    }
}

impl Default for RangefinderAdapter {
    fn default() -> Self {
        Self::new(&BluetoothAdapterConfig::rangefinder())
    }
}

#[async_trait]
impl DeviceAdapter for RangefinderAdapter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn device_type(&self) -> DeviceType {
        DeviceType::Rangefinder
    }

    async fn pair(&self, request: PairingRequest) -> Result<PairedDevice, PairingError> {
        let details = self.link.validate(Self::NAME, &request)?;
        request.require_metadata(Self::NAME, &["max_range"])?;

        let max_range = request.metadata.get("max_range").cloned().unwrap_or_default();
        if !max_range.as_f64().is_some_and(|range| range > 0.0) {
            return Err(PairingError::rejected(
                Self::NAME,
                "rangefinder reported invalid max_range value",
            )
            .with_context("max_range", max_range));
        }

        let mut capabilities = vec![DeviceCapability::DistanceMeasurement];
        if request.metadata.get("supports_inclination").is_none_or(truthy) {
            capabilities.push(DeviceCapability::InclinationMeasurement);
        }

        let mut device = PairedDevice::new(&request, details.address).with_capabilities(capabilities);
        set_default(&mut device.metadata, "calibration", "factory");
        Ok(device)
    }
}
