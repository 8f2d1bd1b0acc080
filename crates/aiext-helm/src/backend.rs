//! The narrow interface to the Helm release backend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chart::ChartReference;
use crate::error::Result;

/// Desired end state of one release.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseSpec {
    pub name: String,
    pub namespace: String,
    pub chart: ChartReference,
    pub version: String,
    pub values: serde_json::Map<String, serde_json::Value>,
}

/// Status of a release revision as reported by Helm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseStatus {
    Deployed,
    Failed,
    PendingInstall,
    PendingUpgrade,
    PendingRollback,
    Superseded,
    Uninstalling,
    Uninstalled,
    #[serde(other)]
    Unknown,
}

/// One revision of a release as stored by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseRecord {
    pub name: String,
    pub namespace: String,
    pub revision: u32,
    pub status: ReleaseStatus,
    pub chart_name: String,
    pub chart_version: String,
    pub values: serde_json::Map<String, serde_json::Value>,
    pub manifest: String,
}

/// Observed state of an existing release, as returned to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseInfo {
    pub chart_name: String,
    pub version: String,
    pub values: serde_json::Map<String, serde_json::Value>,
    pub status: ReleaseStatus,
    pub revision: u32,
}

impl From<ReleaseRecord> for ReleaseInfo {
    fn from(record: ReleaseRecord) -> Self {
        Self {
            chart_name: record.chart_name,
            version: record.chart_version,
            values: record.values,
            status: record.status,
            revision: record.revision,
        }
    }
}

/// Flags for an upgrade run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeOptions {
    /// Render only; the backend is not mutated.
    pub dry_run: bool,
    /// Wait for resources to become ready.
    pub wait: bool,
    /// Roll back on failure.
    pub atomic: bool,
    pub timeout: Duration,
}

impl UpgradeOptions {
    pub fn dry_run(timeout: Duration) -> Self {
        Self {
            dry_run: true,
            wait: false,
            atomic: false,
            timeout,
        }
    }

    /// A real upgrade. Not atomic: a failed upgrade keeps whatever state it reached.
    pub fn apply(timeout: Duration) -> Self {
        Self {
            dry_run: false,
            wait: true,
            atomic: false,
            timeout,
        }
    }
}

/// How dependents are removed when a release is uninstalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionPropagation {
    Background,
    Foreground,
    Orphan,
}

impl DeletionPropagation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Foreground => "foreground",
            Self::Orphan => "orphan",
        }
    }
}

/// Operations the release manager needs from Helm.
///
/// Implementations must stop work started by a call when its future is dropped.
#[async_trait]
pub trait ReleaseBackend: Send + Sync {
    /// The most recent revision of `name`, or `None` if it has no history.
    async fn latest_release(&self, name: &str, namespace: &str) -> Result<Option<ReleaseRecord>>;

    /// The manifest of the currently deployed revision.
    async fn deployed_manifest(&self, name: &str, namespace: &str) -> Result<String>;

    /// Download `reference` at `version` and unpack it below `dest`,
    /// returning the chart directory.
    async fn pull_chart(
        &self,
        reference: &ChartReference,
        version: &str,
        dest: &Path,
    ) -> Result<PathBuf>;

    async fn install(
        &self,
        spec: &ReleaseSpec,
        chart_path: &Path,
        timeout: Duration,
    ) -> Result<ReleaseRecord>;

    /// Upgrade (or render, with [`UpgradeOptions::dry_run`]) the release.
    /// The returned record carries the rendered manifest.
    async fn upgrade(
        &self,
        spec: &ReleaseSpec,
        chart_path: &Path,
        options: UpgradeOptions,
    ) -> Result<ReleaseRecord>;

    /// Returns [`crate::Error::ReleaseNotFound`] when the release does not exist.
    async fn uninstall(
        &self,
        name: &str,
        namespace: &str,
        propagation: DeletionPropagation,
    ) -> Result<()>;
}
