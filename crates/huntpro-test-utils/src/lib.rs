// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Hunt Pro integration tests.
//!
//! Provides mock adapters and plugin fixtures for fast, deterministic tests
//! without Bluetooth hardware or installed packages.
//!
//! # Components
//!
//! - [`StubAdapter`] - Succeeds (or rejects) immediately and counts calls
//! - [`HangingAdapter`] - Never completes; reports when its future is dropped
//! - [`BlockingAdapter`] - Blocks its worker thread before completing
//! - [`PanickingAdapter`] - Panics inside `pair`
//! - [`CountingFactory`] - Plugin factory that records invocations
//! - [`fixtures`] - Descriptor, entry point, and request builders

pub mod fixtures;
pub mod mock_adapter;

pub use fixtures::CountingFactory;
pub use mock_adapter::{BlockingAdapter, HangingAdapter, PanickingAdapter, StubAdapter};
