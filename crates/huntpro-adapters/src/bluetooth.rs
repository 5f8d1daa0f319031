// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bluetooth Low Energy connection checks shared by the built-in adapters.

use huntpro_config::BluetoothAdapterConfig;
use huntpro_core::{PairingError, PairingRequest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

fn default_protocol() -> String {
    "BLE".to_string()
}

/// Connection parameters of a BLE advertisement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BluetoothDetails {
    pub address: String,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub rssi: Option<i32>,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

impl BluetoothDetails {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            services: Vec::new(),
            rssi: None,
            protocol: default_protocol(),
        }
    }

    pub fn with_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services = services.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rssi(mut self, rssi: i32) -> Self {
        self.rssi = Some(rssi);
        self
    }

    /// Parse the details out of a request's opaque connection parameters.
    pub fn from_params(adapter: &str, params: &Map<String, Value>) -> Result<Self, PairingError> {
        serde_json::from_value(Value::Object(params.clone())).map_err(|e| {
            PairingError::rejected(adapter, format!("invalid Bluetooth connection parameters: {e}"))
        })
    }

    /// Render as connection parameters for a [`PairingRequest`].
    pub fn into_params(self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    pub fn ensure_services(&self, adapter: &str, required: &[String]) -> Result<(), PairingError> {
        let missing: Vec<&str> = required
            .iter()
            .filter(|svc| !self.services.contains(svc))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(PairingError::rejected(
            adapter,
            format!(
                "Bluetooth device does not expose required services: {}",
                missing.join(", ")
            ),
        )
        .with_context("missing_services", missing))
    }

    pub fn ensure_signal_strength(&self, adapter: &str, minimum_rssi: i32) -> Result<(), PairingError> {
        match self.rssi {
            None => Err(PairingError::rejected(adapter, "Bluetooth signal strength (RSSI) unknown")),
            Some(rssi) if rssi < minimum_rssi => Err(PairingError::rejected(
                adapter,
                format!("signal too weak for stable pairing: {rssi} < {minimum_rssi}"),
            )
            .with_context("rssi", rssi)
            .with_context("minimum_rssi", minimum_rssi)),
            Some(_) => Ok(()),
        }
    }
}

/// Signal and service requirements one adapter enforces before its handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct BluetoothLink {
    minimum_rssi: i32,
    required_services: Vec<String>,
}

impl BluetoothLink {
    pub fn new(minimum_rssi: i32, required_services: Vec<String>) -> Self {
        Self {
            minimum_rssi,
            required_services,
        }
    }

    pub fn from_config(config: &BluetoothAdapterConfig) -> Self {
        Self::new(config.minimum_rssi, config.required_services.clone())
    }

    pub fn minimum_rssi(&self) -> i32 {
        self.minimum_rssi
    }

    pub fn required_services(&self) -> &[String] {
        &self.required_services
    }

    /// Check the request's connection against this link's requirements.
    pub fn validate(&self, adapter: &str, request: &PairingRequest) -> Result<BluetoothDetails, PairingError> {
        if request.cancel.is_cancelled() {
            return Err(PairingError::rejected(adapter, "pairing cancelled before handshake"));
        }
        let details = BluetoothDetails::from_params(adapter, &request.connection_params)?;
        details.ensure_signal_strength(adapter, self.minimum_rssi)?;
        if !self.required_services.is_empty() {
            details.ensure_services(adapter, &self.required_services)?;
        }
        debug!(
            adapter,
            address = details.address.as_str(),
            rssi = details.rssi,
            "bluetooth link accepted"
        );
        Ok(details)
    }
}
