// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Hunt Pro device subsystem.
//!
//! This crate provides the data model, error taxonomy, and the
//! [`DeviceAdapter`] contract shared by the plugin registry, the built-in
//! adapters, and the pairing coordinator.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{DiscoveryIssue, HuntError, PairingError};
pub use traits::DeviceAdapter;
pub use types::{
    DEFAULT_PAIRING_TIMEOUT, DeviceCapability, DeviceIdentity, DeviceType, PairedDevice,
    PairingRequest, SessionHandle,
};
