// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Package manifest parsing from `plugin.toml` files.
//!
//! An installed device-adapter package ships a manifest advertising which
//! contribution key it registers under and which linked entry point provides
//! its descriptor.

use std::str::FromStr;

use huntpro_core::{DeviceType, HuntError};
use serde::{Deserialize, Serialize};

/// Parsed manifest of an installed plugin package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Unique package name (e.g., "acme-rangefinder").
    pub name: String,
    /// Semantic version of the package.
    pub version: semver::Version,
    pub description: String,
    pub author: Option<String>,
    /// Contribution key the package registers under.
    pub group: String,
    /// Name of the linked entry point that yields the package's descriptor.
    pub entry_point: String,
    /// Device categories the package claims to contribute. Advisory only.
    pub device_types: Vec<DeviceType>,
}

/// Intermediate TOML deserialization struct for `plugin.toml`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackageManifestFile {
    plugin: PluginSection,
}

/// The `[plugin]` section of a `plugin.toml` file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PluginSection {
    name: String,
    version: String,
    #[serde(default)]
    description: String,
    author: Option<String>,
    group: String,
    entry_point: String,
    #[serde(default)]
    device_types: Vec<String>,
}

/// Parse a package manifest from TOML content.
///
/// `origin` names the file in error messages. Validates that name and entry
/// point are non-empty, the version is semver, and every device type is known.
pub fn parse_package_manifest(origin: &str, toml_content: &str) -> Result<PackageManifest, HuntError> {
    let invalid = |message: String| HuntError::Manifest {
        path: origin.to_string(),
        message,
    };

    let file: PackageManifestFile =
        toml::from_str(toml_content).map_err(|e| invalid(e.message().to_string()))?;
    let section = file.plugin;

    if section.name.trim().is_empty() {
        return Err(invalid("name must not be empty".to_string()));
    }

    if section.entry_point.trim().is_empty() {
        return Err(invalid("entry_point must not be empty".to_string()));
    }

    let version = semver::Version::parse(&section.version)
        .map_err(|e| invalid(format!("version `{}` is not semver: {e}", section.version)))?;

    let device_types = section
        .device_types
        .iter()
        .map(|raw| {
            DeviceType::from_str(raw).map_err(|_| invalid(format!("unknown device type `{raw}`")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PackageManifest {
        name: section.name,
        version,
        description: section.description,
        author: section.author,
        group: section.group,
        entry_point: section.entry_point,
        device_types,
    })
}
