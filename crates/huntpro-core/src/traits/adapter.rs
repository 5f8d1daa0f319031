// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The contract every device adapter, built-in or third-party, implements.

use async_trait::async_trait;

use crate::error::PairingError;
use crate::types::{DeviceType, PairedDevice, PairingRequest};

/// Device-category-specific connection and pairing logic.
///
/// Implementations must translate every internal failure into a
/// [`PairingError`]. `pair` may wait on hardware I/O; it should watch
/// `request.cancel` and unwind promptly once it fires, reclaiming any
/// transport resources it allocated.
#[async_trait]
pub trait DeviceAdapter: Send + Sync + 'static {
    /// Human-readable adapter name, used in diagnostics and registry summaries.
    fn name(&self) -> &str;

    /// The device category this adapter pairs. Constant for the adapter's lifetime.
    fn device_type(&self) -> DeviceType;

    /// Attempt to pair the device described by `request`.
    async fn pair(&self, request: PairingRequest) -> Result<PairedDevice, PairingError>;
}
