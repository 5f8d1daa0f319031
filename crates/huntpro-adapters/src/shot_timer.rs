// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use huntpro_config::BluetoothAdapterConfig;
use huntpro_core::{DeviceAdapter, DeviceCapability, DeviceType, PairedDevice, PairingError, PairingRequest};

use crate::bluetooth::BluetoothLink;
use crate::{set_default, truthy};

/// Pairs Bluetooth shot timers used for range practice.
#[derive(Debug, Clone)]
pub struct ShotTimerAdapter {
    link: BluetoothLink,
}

impl ShotTimerAdapter {
    pub const NAME: &'static str = "huntpro-shot-timer";

    pub fn new(config: &BluetoothAdapterConfig) -> Self {
        Self {
            link: BluetoothLink::from_config(config),
        }
    }
}

impl Default for ShotTimerAdapter {
    fn default() -> Self {
        Self::new(&BluetoothAdapterConfig::shot_timer())
    }
}

#[async_trait]
impl DeviceAdapter for ShotTimerAdapter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn device_type(&self) -> DeviceType {
        DeviceType::ShotTimer
    }

    async fn pair(&self, request: PairingRequest) -> Result<PairedDevice, PairingError> {
        let details = self.link.validate(Self::NAME, &request)?;
        request.require_metadata(Self::NAME, &["min_split_ms", "sensitivity_db"])?;

        let min_split = request.metadata.get("min_split_ms").cloned().unwrap_or_default();
        if !min_split.as_f64().is_some_and(|ms| ms > 0.0) {
            return Err(PairingError::rejected(
                Self::NAME,
                "shot timer minimum split must be a positive number",
            )
            .with_context("min_split_ms", min_split));
        }
        let sensitivity = request.metadata.get("sensitivity_db").cloned().unwrap_or_default();
        if !sensitivity.is_number() {
            return Err(
                PairingError::rejected(Self::NAME, "shot timer sensitivity must be numeric")
                    .with_context("sensitivity_db", sensitivity),
            );
        }

        let mut device = PairedDevice::new(&request, details.address);
        set_default(&mut device.metadata, "supports_strings", true);

        let mut capabilities = vec![DeviceCapability::ShotDetection];
        if device.metadata.get("supports_strings").is_some_and(truthy) {
            capabilities.push(DeviceCapability::SplitTimes);
        }
        Ok(device.with_capabilities(capabilities))
    }
}
