// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;

use async_trait::async_trait;
use huntpro_config::BluetoothAdapterConfig;
use huntpro_core::{DeviceAdapter, DeviceCapability, DeviceType, PairedDevice, PairingError, PairingRequest};
use serde_json::Value;
use tracing::debug;

use crate::bluetooth::BluetoothLink;
use crate::set_default;

/// Pairs Bluetooth weather meters. Capabilities follow the advertised sensors.
#[derive(Debug, Clone)]
pub struct WeatherMeterAdapter {
    link: BluetoothLink,
}

impl WeatherMeterAdapter {
    pub const NAME: &'static str = "huntpro-weather-meter";

    pub fn new(config: &BluetoothAdapterConfig) -> Self {
        Self {
            link: BluetoothLink::from_config(config),
        }
    }

    /// Capability reported by a named sensor, if the meter supports it.
    pub fn sensor_capability(sensor: &str) -> Option<DeviceCapability> {
        match sensor {
            "temperature" => Some(DeviceCapability::Temperature),
            "humidity" => Some(DeviceCapability::Humidity),
            "wind_speed" => Some(DeviceCapability::WindSpeed),
            "wind_direction" => Some(DeviceCapability::WindDirection),
            "pressure" => Some(DeviceCapability::BarometricPressure),
            _ => None,
        }
    }
}

impl Default for WeatherMeterAdapter {
    fn default() -> Self {
        Self::new(&BluetoothAdapterConfig::weather_meter())
    }
}

#[async_trait]
impl DeviceAdapter for WeatherMeterAdapter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn device_type(&self) -> DeviceType {
        DeviceType::WeatherMeter
    }

    async fn pair(&self, request: PairingRequest) -> Result<PairedDevice, PairingError> {
        let details = self.link.validate(Self::NAME, &request)?;
        request.require_metadata(Self::NAME, &["sensors"])?;

        let Some(sensors) = request.metadata.get("sensors").and_then(Value::as_array) else {
            return Err(PairingError::rejected(
                Self::NAME,
                "weather meter sensors metadata must be a list",
            ));
        };

        let mut capabilities = BTreeSet::new();
        for sensor in sensors {
            let name = match sensor {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            match Self::sensor_capability(&name) {
                Some(capability) => {
                    capabilities.insert(capability);
                }
                None => debug!(sensor = name.as_str(), "ignoring unsupported weather sensor"),
            }
        }
        if capabilities.is_empty() {
            return Err(PairingError::rejected(
                Self::NAME,
                "weather meter exposes no supported sensors",
            )
            .with_context("sensors", sensors.clone()));
        }

        let mut device = PairedDevice::new(&request, details.address).with_capabilities(capabilities);
        set_default(&mut device.metadata, "sample_rate_hz", 1);
        Ok(device)
    }
}
