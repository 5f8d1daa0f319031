// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Hunt Pro device subsystem.
//!
//! Pairing-time failures ([`PairingError`]) are always returned to the caller.
//! Discovery-time failures ([`DiscoveryIssue`]) are always recovered locally and
//! surface only as diagnostics. Both serialize to plain structured data so they
//! can cross into UI and log collaborators.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::DeviceType;

/// Typed failure of a single pairing attempt.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PairingError {
    /// No adapter is registered for the requested device category.
    #[error("no adapter registered for {device_type}")]
    UnsupportedDeviceType { device_type: DeviceType },

    /// Another pairing attempt for the same device category is in flight.
    #[error("a pairing attempt for {device_type} is already in progress")]
    DeviceBusy { device_type: DeviceType },

    /// The adapter did not complete within the request deadline.
    #[error("pairing {device_type} timed out after {timeout_ms}ms")]
    PairingTimeout {
        device_type: DeviceType,
        timeout_ms: u64,
    },

    /// The adapter rejected the pairing (handshake refused, invalid metadata,
    /// weak signal, ...). `context` is adapter-supplied and passed through verbatim.
    #[error("{adapter} rejected pairing: {reason}")]
    Rejected {
        adapter: String,
        reason: String,
        #[serde(skip_serializing_if = "Map::is_empty")]
        context: Map<String, Value>,
    },
}

impl PairingError {
    /// Build an adapter rejection with an empty context.
    pub fn rejected(adapter: impl Into<String>, reason: impl Into<String>) -> Self {
        PairingError::Rejected {
            adapter: adapter.into(),
            reason: reason.into(),
            context: Map::new(),
        }
    }

    /// Attach a context entry to a rejection. Other variants are returned unchanged.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let PairingError::Rejected { context, .. } = &mut self {
            context.insert(key.into(), value.into());
        }
        self
    }

    /// Builds the timeout error for the given request deadline.
    pub fn timed_out(device_type: DeviceType, timeout: Duration) -> Self {
        PairingError::PairingTimeout {
            device_type,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Short machine-readable tag, matching the serialized `kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            PairingError::UnsupportedDeviceType { .. } => "unsupported_device_type",
            PairingError::DeviceBusy { .. } => "device_busy",
            PairingError::PairingTimeout { .. } => "pairing_timeout",
            PairingError::Rejected { .. } => "rejected",
        }
    }
}

/// A problem found while discovering plugins. Never fatal: the offending
/// descriptor (or contribution) is skipped and discovery continues.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscoveryIssue {
    /// The descriptor targets a different plugin API; its factory was not invoked.
    #[error("plugin API version `{declared}` does not match host version `{supported}`")]
    IncompatibleApiVersion { declared: String, supported: String },

    /// The descriptor's factory (or entry point constructor) failed or panicked.
    #[error("plugin failed to load: {reason}")]
    PluginLoadFailure { reason: String },

    /// The entry point could not be turned into a descriptor.
    #[error("invalid plugin entry point: {reason}")]
    InvalidEntryPoint { reason: String },

    /// A contribution without `replace_existing` targeted an occupied device type.
    #[error("contribution for {device_type} ignored; keeping `{kept}`")]
    ContributionIgnored { device_type: DeviceType, kept: String },

    /// The plugin source could not be enumerated at all.
    #[error("plugin source unavailable: {reason}")]
    SourceUnavailable { reason: String },
}

/// Umbrella error for non-pairing operations: configuration, manifests, I/O.
#[derive(Debug, Error)]
pub enum HuntError {
    /// Configuration errors (invalid TOML, missing fields, failed validation).
    #[error("configuration error: {0}")]
    Config(String),

    /// A plugin package manifest could not be parsed or validated.
    #[error("invalid plugin manifest {path}: {message}")]
    Manifest { path: String, message: String },

    /// Filesystem errors while scanning plugin packages.
    #[error("i/o error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A pairing attempt failed.
    #[error(transparent)]
    Pairing(#[from] PairingError),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
