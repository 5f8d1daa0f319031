// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Adapters use `#[async_trait]` so they can be held as `Arc<dyn DeviceAdapter>`.

pub mod adapter;

pub use adapter::DeviceAdapter;
