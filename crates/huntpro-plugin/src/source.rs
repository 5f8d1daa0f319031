// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin sources: the injectable enumeration of installed entry points.
//!
//! The loader never scans anything itself; it asks a [`PluginSource`] for the
//! entry points currently installed. Tests use [`StaticSource`] or a plain
//! closure, production uses [`ManifestDirSource`].

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use huntpro_core::{DiscoveryIssue, HuntError};
use tracing::debug;

use crate::descriptor::{BoxError, DEVICE_ADAPTER_GROUP, PluginDescriptor, panic_message};
use crate::manifest::{PackageManifest, parse_package_manifest};

/// Zero-argument callable producing a descriptor.
pub type DescriptorConstructor = Arc<dyn Fn() -> Result<PluginDescriptor, BoxError> + Send + Sync>;

/// What an entry point resolves to.
#[derive(Clone)]
pub enum EntryTarget {
    /// A ready descriptor instance.
    Descriptor(PluginDescriptor),
    /// A callable that builds the descriptor on demand.
    Constructor(DescriptorConstructor),
    /// Advertised by a package but impossible to bind (bad manifest, unknown entry point).
    Unresolved(String),
}

/// One advertised entry point of an installed package.
#[derive(Clone)]
pub struct EntryPoint {
    pub name: String,
    pub group: String,
    pub target: EntryTarget,
}

impl EntryPoint {
    /// Entry point under the device adapter group resolving to `descriptor`.
    pub fn descriptor(name: impl Into<String>, descriptor: PluginDescriptor) -> Self {
        Self {
            name: name.into(),
            group: DEVICE_ADAPTER_GROUP.to_string(),
            target: EntryTarget::Descriptor(descriptor),
        }
    }

    /// Entry point under the device adapter group resolving through `constructor`.
    pub fn constructor<F>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Result<PluginDescriptor, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            group: DEVICE_ADAPTER_GROUP.to_string(),
            target: EntryTarget::Constructor(Arc::new(constructor)),
        }
    }

    pub fn unresolved(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: DEVICE_ADAPTER_GROUP.to_string(),
            target: EntryTarget::Unresolved(reason.into()),
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Turn the entry point into a descriptor, containing constructor faults.
    pub fn resolve(&self) -> Result<PluginDescriptor, DiscoveryIssue> {
        match &self.target {
            EntryTarget::Descriptor(descriptor) => Ok(descriptor.clone()),
            EntryTarget::Constructor(constructor) => {
                match catch_unwind(AssertUnwindSafe(|| constructor())) {
                    Ok(Ok(descriptor)) => Ok(descriptor),
                    Ok(Err(err)) => Err(DiscoveryIssue::PluginLoadFailure {
                        reason: format!("entry point constructor failed: {err}"),
                    }),
                    Err(payload) => Err(DiscoveryIssue::PluginLoadFailure {
                        reason: format!(
                            "entry point constructor panicked: {}",
                            panic_message(payload.as_ref())
                        ),
                    }),
                }
            }
            EntryTarget::Unresolved(reason) => Err(DiscoveryIssue::InvalidEntryPoint {
                reason: reason.clone(),
            }),
        }
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match &self.target {
            EntryTarget::Descriptor(d) => format!("descriptor({})", d.source_id),
            EntryTarget::Constructor(_) => "constructor".to_string(),
            EntryTarget::Unresolved(reason) => format!("unresolved({reason})"),
        };
        f.debug_struct("EntryPoint")
            .field("name", &self.name)
            .field("group", &self.group)
            .field("target", &target)
            .finish()
    }
}

/// Enumerates installed entry points. Order must be stable between calls.
pub trait PluginSource: Send + Sync {
    fn entry_points(&self) -> Result<Vec<EntryPoint>, HuntError>;
}

impl<F> PluginSource for F
where
    F: Fn() -> Result<Vec<EntryPoint>, HuntError> + Send + Sync,
{
    fn entry_points(&self) -> Result<Vec<EntryPoint>, HuntError> {
        self()
    }
}

/// Fixed, in-memory list of entry points.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    entries: Vec<EntryPoint>,
}

impl StaticSource {
    pub fn new(entries: Vec<EntryPoint>) -> Self {
        Self { entries }
    }

    /// A source with nothing installed.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, entry: EntryPoint) -> Self {
        self.entries.push(entry);
        self
    }
}

impl PluginSource for StaticSource {
    fn entry_points(&self) -> Result<Vec<EntryPoint>, HuntError> {
        Ok(self.entries.clone())
    }
}

/// File name of a package manifest inside its package directory.
pub const MANIFEST_FILE: &str = "plugin.toml";

/// Scans `<dir>/*/plugin.toml` and binds each manifest to a linked constructor.
///
/// Packages are visited in directory-name order so repeated scans are
/// reproducible. A missing plugin directory means nothing is installed.
pub struct ManifestDirSource {
    dir: PathBuf,
    linked: HashMap<String, DescriptorConstructor>,
}

impl ManifestDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            linked: HashMap::new(),
        }
    }

    /// Make a compiled-in constructor available under `entry_point`.
    pub fn link<F>(mut self, entry_point: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Result<PluginDescriptor, BoxError> + Send + Sync + 'static,
    {
        self.linked.insert(entry_point.into(), Arc::new(constructor));
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn bind(&self, manifest: &PackageManifest) -> EntryPoint {
        let target = match self.linked.get(&manifest.entry_point) {
            Some(constructor) => EntryTarget::Constructor(Arc::clone(constructor)),
            None => EntryTarget::Unresolved(format!(
                "package `{}` names entry point `{}` which is not linked into this build",
                manifest.name, manifest.entry_point
            )),
        };
        EntryPoint {
            name: manifest.name.clone(),
            group: manifest.group.clone(),
            target,
        }
    }
}

impl PluginSource for ManifestDirSource {
    fn entry_points(&self) -> Result<Vec<EntryPoint>, HuntError> {
        if !self.dir.exists() {
            debug!(dir = %self.dir.display(), "plugin directory does not exist");
            return Ok(Vec::new());
        }

        let io_err = |path: &Path, source: std::io::Error| HuntError::Io {
            path: path.display().to_string(),
            source,
        };

        let mut package_dirs = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(|e| io_err(&self.dir, e))? {
            let path = entry.map_err(|e| io_err(&self.dir, e))?.path();
            if path.is_dir() {
                package_dirs.push(path);
            }
        }
        package_dirs.sort();

        let mut entries = Vec::new();
        for package in package_dirs {
            let manifest_path = package.join(MANIFEST_FILE);
            if !manifest_path.is_file() {
                continue;
            }
            let package_name = package
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let origin = manifest_path.display().to_string();

            let parsed = std::fs::read_to_string(&manifest_path)
                .map_err(|e| io_err(&manifest_path, e))
                .and_then(|content| parse_package_manifest(&origin, &content));
            let entry = match parsed {
                Ok(manifest) => self.bind(&manifest),
                Err(err) => EntryPoint::unresolved(package_name, err.to_string()),
            };
            entries.push(entry);
        }

        Ok(entries)
    }
}
