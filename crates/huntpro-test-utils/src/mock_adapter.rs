// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock device adapters with scripted behaviour.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use huntpro_core::{DeviceAdapter, DeviceCapability, DeviceType, PairedDevice, PairingError, PairingRequest};
use serde_json::{Map, Value};

/// An adapter that answers immediately.
///
/// Succeeds by default, tagging the paired device's metadata with
/// `"adapter": <name>`. Every call is counted.
#[derive(Clone)]
pub struct StubAdapter {
    name: String,
    device_type: DeviceType,
    rejection: Option<String>,
    capabilities: Vec<DeviceCapability>,
    extra_metadata: Map<String, Value>,
    calls: Arc<AtomicUsize>,
}

impl StubAdapter {
    pub fn new(name: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            name: name.into(),
            device_type,
            rejection: None,
            capabilities: Vec::new(),
            extra_metadata: Map::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A stub that rejects every pairing with `reason`.
    pub fn rejecting(name: impl Into<String>, device_type: DeviceType, reason: impl Into<String>) -> Self {
        let mut stub = Self::new(name, device_type);
        stub.rejection = Some(reason.into());
        stub
    }

    pub fn with_capabilities(mut self, caps: impl IntoIterator<Item = DeviceCapability>) -> Self {
        self.capabilities.extend(caps);
        self
    }

    /// Metadata entry added to every device this stub pairs.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_metadata.insert(key.into(), value.into());
        self
    }

    /// Number of times `pair` was called (shared across clones).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceAdapter for StubAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn device_type(&self) -> DeviceType {
        self.device_type
    }

    async fn pair(&self, request: PairingRequest) -> Result<PairedDevice, PairingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.rejection {
            return Err(PairingError::rejected(self.name.clone(), reason.clone()));
        }
        let address = format!("stub:{}", request.identity.serial_number);
        let mut device = PairedDevice::new(&request, address).with_capabilities(self.capabilities.iter().copied());
        device.metadata.insert("adapter".into(), Value::from(self.name.clone()));
        device
            .metadata
            .extend(self.extra_metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(device)
    }
}

/// An adapter whose `pair` never completes.
///
/// Records whether the pending future was dropped, which is how a timed-out
/// attempt's abort becomes observable.
#[derive(Clone)]
pub struct HangingAdapter {
    device_type: DeviceType,
    started: Arc<AtomicUsize>,
    dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl HangingAdapter {
    pub fn new(device_type: DeviceType) -> Self {
        Self {
            device_type,
            started: Arc::new(AtomicUsize::new(0)),
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// True once an in-flight `pair` future was dropped.
    pub fn was_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceAdapter for HangingAdapter {
    fn name(&self) -> &str {
        "hanging"
    }

    fn device_type(&self) -> DeviceType {
        self.device_type
    }

    async fn pair(&self, _request: PairingRequest) -> Result<PairedDevice, PairingError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let _flag = DropFlag(Arc::clone(&self.dropped));
        std::future::pending::<()>().await;
        Err(PairingError::rejected("hanging", "unreachable"))
    }
}

/// An adapter that blocks its worker thread, ignoring cancellation.
#[derive(Clone)]
pub struct BlockingAdapter {
    device_type: DeviceType,
    block_for: Duration,
}

impl BlockingAdapter {
    pub fn new(device_type: DeviceType, block_for: Duration) -> Self {
        Self { device_type, block_for }
    }
}

#[async_trait]
impl DeviceAdapter for BlockingAdapter {
    fn name(&self) -> &str {
        "blocking"
    }

    fn device_type(&self) -> DeviceType {
        self.device_type
    }

    async fn pair(&self, request: PairingRequest) -> Result<PairedDevice, PairingError> {
        std::thread::sleep(self.block_for);
        Ok(PairedDevice::new(&request, "blocking:0"))
    }
}

/// An adapter that panics inside `pair`.
#[derive(Clone)]
pub struct PanickingAdapter {
    device_type: DeviceType,
    message: String,
}

impl PanickingAdapter {
    pub fn new(device_type: DeviceType, message: impl Into<String>) -> Self {
        Self {
            device_type,
            message: message.into(),
        }
    }
}

#[async_trait]
impl DeviceAdapter for PanickingAdapter {
    fn name(&self) -> &str {
        "panicking"
    }

    fn device_type(&self) -> DeviceType {
        self.device_type
    }

    async fn pair(&self, _request: PairingRequest) -> Result<PairedDevice, PairingError> {
        panic!("{}", self.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huntpro_core::DeviceIdentity;

    fn request(device_type: DeviceType) -> PairingRequest {
        PairingRequest::new(device_type, DeviceIdentity::new("Test", "Stub", "S-1"))
    }

    #[tokio::test]
    async fn stub_counts_and_tags() {
        let stub = StubAdapter::new("acme", DeviceType::Gps)
            .with_capabilities([DeviceCapability::PositionFix])
            .with_metadata("vendor_profile", "acme");
        let clone = stub.clone();

        let device = stub.pair(request(DeviceType::Gps)).await.unwrap();

        assert_eq!(clone.calls(), 1);
        assert_eq!(device.metadata["adapter"], "acme");
        assert_eq!(device.metadata["vendor_profile"], "acme");
        assert!(device.has(DeviceCapability::PositionFix));
        assert_eq!(device.address, "stub:S-1");
    }

    #[tokio::test]
    async fn rejecting_stub() {
        let stub = StubAdapter::rejecting("grumpy", DeviceType::Gps, "handshake refused");
        let err = stub.pair(request(DeviceType::Gps)).await.unwrap_err();
        assert_eq!(err, PairingError::rejected("grumpy", "handshake refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_adapter_reports_drop() {
        let adapter = HangingAdapter::new(DeviceType::Chronograph);
        let result = tokio::time::timeout(
            Duration::from_millis(50),
            adapter.pair(request(DeviceType::Chronograph)),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(adapter.started(), 1);
        assert!(adapter.was_dropped());
    }
}
