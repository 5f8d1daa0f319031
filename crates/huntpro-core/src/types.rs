// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by adapters, the plugin registry, and the pairing coordinator.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::PairingError;

/// Default deadline for a pairing attempt when none is configured.
pub const DEFAULT_PAIRING_TIMEOUT: Duration = Duration::from_secs(10);

/// Supported hardware categories. Used as the registry key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Rangefinder,
    WeatherMeter,
    ShotTimer,
    Gps,
    Chronograph,
}

/// Capabilities a paired device may expose.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeviceCapability {
    DistanceMeasurement,
    InclinationMeasurement,
    WindSpeed,
    WindDirection,
    Temperature,
    Humidity,
    BarometricPressure,
    ShotDetection,
    SplitTimes,
    PositionFix,
    MuzzleVelocity,
}

/// Static identity a device exposes during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware: Option<String>,
}

impl DeviceIdentity {
    pub fn new(
        manufacturer: impl Into<String>,
        model: impl Into<String>,
        serial_number: impl Into<String>,
    ) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            model: model.into(),
            serial_number: serial_number.into(),
            firmware: None,
        }
    }

    pub fn with_firmware(mut self, firmware: impl Into<String>) -> Self {
        self.firmware = Some(firmware.into());
        self
    }

    /// Identifier derived from manufacturer, model and serial, lowercased.
    pub fn device_id(&self) -> String {
        format!(
            "{}:{}:{}",
            self.manufacturer, self.model, self.serial_number
        )
        .to_lowercase()
    }

    /// Human-readable label, e.g. `HuntPro XR-1200 v1.2.3`.
    pub fn label(&self) -> String {
        match &self.firmware {
            Some(fw) => format!("{} {} v{fw}", self.manufacturer, self.model),
            None => format!("{} {}", self.manufacturer, self.model),
        }
    }
}

/// Everything an adapter needs to attempt a pairing.
///
/// `connection_params` is transport-specific and opaque to the coordinator;
/// adapters parse what they need from it. `cancel` is triggered by the
/// coordinator when the deadline expires.
#[derive(Debug, Clone)]
pub struct PairingRequest {
    pub device_type: DeviceType,
    pub identity: DeviceIdentity,
    pub connection_params: Map<String, Value>,
    pub metadata: Map<String, Value>,
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

impl PairingRequest {
    pub fn new(device_type: DeviceType, identity: DeviceIdentity) -> Self {
        Self {
            device_type,
            identity,
            connection_params: Map::new(),
            metadata: Map::new(),
            timeout: DEFAULT_PAIRING_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_connection_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.connection_params.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fail with a rejection naming every missing metadata key.
    pub fn require_metadata(&self, adapter: &str, keys: &[&str]) -> Result<(), PairingError> {
        let missing: Vec<&str> = keys
            .iter()
            .copied()
            .filter(|k| !self.metadata.contains_key(*k))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(PairingError::rejected(
            adapter,
            format!("missing metadata required for pairing: {}", missing.join(", ")),
        )
        .with_context("missing", missing))
    }
}

#[derive(Debug)]
struct SessionState {
    session_id: Uuid,
    lost: CancellationToken,
    closed: CancellationToken,
}

/// Live session with a paired device.
///
/// Clones share state. The adapter calls [`SessionHandle::mark_lost`] when the
/// transport drops; the caller calls [`SessionHandle::close`] to disconnect.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<SessionState>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionState {
                session_id: Uuid::new_v4(),
                lost: CancellationToken::new(),
                closed: CancellationToken::new(),
            }),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    pub fn is_active(&self) -> bool {
        !self.inner.lost.is_cancelled() && !self.inner.closed.is_cancelled()
    }

    /// True once the adapter reported loss of connectivity.
    pub fn is_lost(&self) -> bool {
        self.inner.lost.is_cancelled()
    }

    pub fn mark_lost(&self) {
        self.inner.lost.cancel();
    }

    pub fn close(&self) {
        self.inner.closed.cancel();
    }

    /// Resolves once the session was closed or lost.
    pub async fn ended(&self) {
        tokio::select! {
            _ = self.inner.lost.cancelled() => {}
            _ = self.inner.closed.cancelled() => {}
        }
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.session_id == other.inner.session_id
    }
}

impl Serialize for SessionHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("SessionHandle", 2)?;
        s.serialize_field("session_id", &self.inner.session_id)?;
        s.serialize_field("active", &self.is_active())?;
        s.end()
    }
}

/// A device that completed pairing. Only adapters create these; ownership
/// passes to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct PairedDevice {
    pub device_id: String,
    pub device_type: DeviceType,
    pub identity: DeviceIdentity,
    pub capabilities: BTreeSet<DeviceCapability>,
    pub address: String,
    pub metadata: Map<String, Value>,
    pub session: SessionHandle,
    pub paired_at: DateTime<Utc>,
}

impl PairedDevice {
    /// Start a fresh session for the identity in `request`.
    pub fn new(request: &PairingRequest, address: impl Into<String>) -> Self {
        Self {
            device_id: request.identity.device_id(),
            device_type: request.device_type,
            identity: request.identity.clone(),
            capabilities: BTreeSet::new(),
            address: address.into(),
            metadata: request.metadata.clone(),
            session: SessionHandle::new(),
            paired_at: Utc::now(),
        }
    }

    pub fn with_capabilities(mut self, caps: impl IntoIterator<Item = DeviceCapability>) -> Self {
        self.capabilities.extend(caps);
        self
    }

    pub fn label(&self) -> String {
        self.identity.label()
    }

    pub fn has(&self, capability: DeviceCapability) -> bool {
        self.capabilities.contains(&capability)
    }
}
