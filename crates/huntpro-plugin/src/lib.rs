// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device adapter plugins: descriptors, package manifests, discovery, and the registry.
//!
//! Third-party packages advertise entry points under
//! [`DEVICE_ADAPTER_GROUP`]. The [`PluginLoader`] enumerates them through an
//! injectable [`PluginSource`], skips incompatible or failing packages with a
//! diagnostic, and hands the collected contributions to the
//! [`AdapterRegistry`], which resolves overrides against the built-in adapters.

pub mod descriptor;
pub mod loader;
pub mod manifest;
pub mod registry;
pub mod source;

pub use descriptor::{
    AdapterContribution, BoxError, Contributed, DEVICE_ADAPTER_GROUP, PLUGIN_API_VERSION,
    PluginDescriptor,
};
pub use loader::{DiscoveryReport, PluginDiagnostic, PluginLoader, Severity, SourcedContribution};
pub use manifest::{PackageManifest, parse_package_manifest};
pub use registry::{
    AdapterHandle, AdapterOrigin, AdapterRegistry, InstallOutcome, RegistryEntry, RegistrySnapshot,
};
pub use source::{EntryPoint, EntryTarget, MANIFEST_FILE, ManifestDirSource, PluginSource, StaticSource};
