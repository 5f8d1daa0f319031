// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin discovery: enumerate descriptors, check compatibility, isolate failures.
//!
//! A discovery run never aborts. Every problem becomes a [`PluginDiagnostic`]
//! attributed to the offending package, and the run continues with the next
//! entry point. Contributions are collected in discovery order so override
//! resolution is reproducible.

use std::sync::Arc;

use huntpro_core::{DeviceType, DiscoveryIssue};
use serde::Serialize;
use strum::Display;
use tracing::{debug, error, info, warn};

use crate::descriptor::{AdapterContribution, DEVICE_ADAPTER_GROUP, PLUGIN_API_VERSION};
use crate::source::PluginSource;

/// Severity of a discovery diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// One attributable discovery problem, as plain data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDiagnostic {
    pub source_id: String,
    pub severity: Severity,
    pub issue: DiscoveryIssue,
}

impl PluginDiagnostic {
    /// Build a diagnostic and emit it as a tracing event at its severity.
    pub fn record(source_id: impl Into<String>, issue: DiscoveryIssue) -> Self {
        let severity = match issue {
            DiscoveryIssue::PluginLoadFailure { .. } => Severity::Error,
            _ => Severity::Warning,
        };
        let diagnostic = Self {
            source_id: source_id.into(),
            severity,
            issue,
        };
        match diagnostic.severity {
            Severity::Error => error!(
                source_id = diagnostic.source_id.as_str(),
                issue = %diagnostic.issue,
                "device adapter plug-in failed"
            ),
            Severity::Warning => warn!(
                source_id = diagnostic.source_id.as_str(),
                issue = %diagnostic.issue,
                "device adapter plug-in skipped"
            ),
        }
        diagnostic
    }
}

/// A contribution tagged with the package that produced it.
#[derive(Debug, Clone)]
pub struct SourcedContribution {
    pub source_id: String,
    pub contribution: AdapterContribution,
}

/// Outcome of one discovery run.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    /// All contributions from successful descriptors, in discovery order.
    pub contributions: Vec<SourcedContribution>,
    pub diagnostics: Vec<PluginDiagnostic>,
    /// Descriptors whose factory ran successfully.
    pub descriptors_loaded: usize,
}

impl DiscoveryReport {
    /// Diagnostics that came from a factory or constructor failure.
    pub fn load_failures(&self) -> impl Iterator<Item = &PluginDiagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d.issue, DiscoveryIssue::PluginLoadFailure { .. }))
    }

    pub fn contributions_for(&self, device_type: DeviceType) -> impl Iterator<Item = &SourcedContribution> {
        self.contributions
            .iter()
            .filter(move |c| c.contribution.device_type() == device_type)
    }
}

/// Runs discovery against an injectable [`PluginSource`].
#[derive(Clone)]
pub struct PluginLoader {
    source: Arc<dyn PluginSource>,
    api_version: String,
}

impl PluginLoader {
    pub fn new(source: Arc<dyn PluginSource>) -> Self {
        Self {
            source,
            api_version: PLUGIN_API_VERSION.to_string(),
        }
    }

    /// Override the host API version descriptors are compared against.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Enumerate, validate, and invoke every installed descriptor.
    pub fn discover(&self) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        let entry_points = match self.source.entry_points() {
            Ok(entries) => entries,
            Err(err) => {
                report.diagnostics.push(PluginDiagnostic::record(
                    DEVICE_ADAPTER_GROUP,
                    DiscoveryIssue::SourceUnavailable {
                        reason: err.to_string(),
                    },
                ));
                return report;
            }
        };

        for entry in entry_points {
            if entry.group != DEVICE_ADAPTER_GROUP {
                debug!(
                    entry_point = entry.name.as_str(),
                    group = entry.group.as_str(),
                    "ignoring entry point outside the device adapter group"
                );
                continue;
            }

            let descriptor = match entry.resolve() {
                Ok(descriptor) => descriptor,
                Err(issue) => {
                    report.diagnostics.push(PluginDiagnostic::record(&entry.name, issue));
                    continue;
                }
            };

            if descriptor.declared_api_version != self.api_version {
                report.diagnostics.push(PluginDiagnostic::record(
                    &descriptor.source_id,
                    DiscoveryIssue::IncompatibleApiVersion {
                        declared: descriptor.declared_api_version.clone(),
                        supported: self.api_version.clone(),
                    },
                ));
                continue;
            }

            match descriptor.contributions() {
                Ok(contributions) => {
                    debug!(
                        source_id = descriptor.source_id.as_str(),
                        count = contributions.len(),
                        "plug-in contributed adapters"
                    );
                    report.descriptors_loaded += 1;
                    report
                        .contributions
                        .extend(contributions.into_iter().map(|contribution| SourcedContribution {
                            source_id: descriptor.source_id.clone(),
                            contribution,
                        }));
                }
                Err(issue) => {
                    report
                        .diagnostics
                        .push(PluginDiagnostic::record(&descriptor.source_id, issue));
                }
            }
        }

        info!(
            descriptors = report.descriptors_loaded,
            contributions = report.contributions.len(),
            diagnostics = report.diagnostics.len(),
            "device adapter discovery finished"
        );
        report
    }
}
