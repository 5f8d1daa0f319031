// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pairing for Hunt Pro field devices.
//!
//! [`PairingCoordinator`] runs single attempts against the adapter registry
//! with deadlines and per-type exclusion. [`DeviceManager`] wraps it with
//! plugin discovery and a table of currently paired devices.

pub mod coordinator;
pub mod manager;

pub use coordinator::PairingCoordinator;
pub use manager::{DeviceManager, ManagerOptions};
