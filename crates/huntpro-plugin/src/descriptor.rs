// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin descriptors and the adapter contributions their factories produce.
//!
//! A descriptor is the unit a third-party package exposes: an identifier for
//! diagnostics, the plugin API version it was built against, and a factory.
//! The factory is only invoked for descriptors whose version matches the host.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use huntpro_core::{DeviceAdapter, DeviceType, DiscoveryIssue};

/// Plugin API version the host supports. Compared by exact string equality.
pub const PLUGIN_API_VERSION: &str = "1.0";

/// Fixed contribution key packages register their entry points under.
pub const DEVICE_ADAPTER_GROUP: &str = "huntpro.device_adapters";

/// Error type third-party factories may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One adapter offered by a plugin, with its override preference.
#[derive(Clone)]
pub struct AdapterContribution {
    pub adapter: Arc<dyn DeviceAdapter>,
    pub replace_existing: bool,
}

impl AdapterContribution {
    /// Contribution that only fills an empty slot.
    pub fn new(adapter: Arc<dyn DeviceAdapter>) -> Self {
        Self {
            adapter,
            replace_existing: false,
        }
    }

    /// Contribution that overrides whatever is registered for its device type.
    pub fn replacing(adapter: Arc<dyn DeviceAdapter>) -> Self {
        Self {
            adapter,
            replace_existing: true,
        }
    }

    pub fn device_type(&self) -> DeviceType {
        self.adapter.device_type()
    }
}

impl fmt::Debug for AdapterContribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterContribution")
            .field("adapter", &self.adapter.name())
            .field("device_type", &self.adapter.device_type())
            .field("replace_existing", &self.replace_existing)
            .finish()
    }
}

/// What a factory may hand back: a bare adapter or an explicit contribution.
pub enum Contributed {
    Bare(Arc<dyn DeviceAdapter>),
    Wrapped(AdapterContribution),
}

impl Contributed {
    pub fn bare<A: DeviceAdapter>(adapter: A) -> Self {
        Contributed::Bare(Arc::new(adapter))
    }

    pub fn replacing<A: DeviceAdapter>(adapter: A) -> Self {
        Contributed::Wrapped(AdapterContribution::replacing(Arc::new(adapter)))
    }

    /// Collapse both shapes into a contribution. Bare adapters never replace.
    pub fn normalize(self) -> AdapterContribution {
        match self {
            Contributed::Bare(adapter) => AdapterContribution::new(adapter),
            Contributed::Wrapped(contribution) => contribution,
        }
    }
}

impl From<AdapterContribution> for Contributed {
    fn from(contribution: AdapterContribution) -> Self {
        Contributed::Wrapped(contribution)
    }
}

type FactoryFn = dyn Fn() -> Result<Vec<Contributed>, BoxError> + Send + Sync;

/// Metadata plus factory exposed by one discovered package.
#[derive(Clone)]
pub struct PluginDescriptor {
    pub source_id: String,
    pub declared_api_version: String,
    factory: Arc<FactoryFn>,
}

impl PluginDescriptor {
    pub fn new<F>(
        source_id: impl Into<String>,
        declared_api_version: impl Into<String>,
        factory: F,
    ) -> Self
    where
        F: Fn() -> Result<Vec<Contributed>, BoxError> + Send + Sync + 'static,
    {
        Self {
            source_id: source_id.into(),
            declared_api_version: declared_api_version.into(),
            factory: Arc::new(factory),
        }
    }

    /// Invoke the factory inside a fault-isolating boundary.
    ///
    /// Errors and panics both become [`DiscoveryIssue::PluginLoadFailure`];
    /// the whole output of a failing factory is discarded.
    pub fn contributions(&self) -> Result<Vec<AdapterContribution>, DiscoveryIssue> {
        let outcome = catch_unwind(AssertUnwindSafe(|| (self.factory)()));
        match outcome {
            Ok(Ok(contributed)) => Ok(contributed.into_iter().map(Contributed::normalize).collect()),
            Ok(Err(err)) => Err(DiscoveryIssue::PluginLoadFailure {
                reason: err.to_string(),
            }),
            Err(payload) => Err(DiscoveryIssue::PluginLoadFailure {
                reason: format!("factory panicked: {}", panic_message(payload.as_ref())),
            }),
        }
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("source_id", &self.source_id)
            .field("declared_api_version", &self.declared_api_version)
            .finish_non_exhaustive()
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
