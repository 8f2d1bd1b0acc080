//! `InstallAIExtension` custom resource.
//!
//! The resource is cluster-scoped. Its spec names one extension version and
//! exactly one installation source: a Helm chart that serves the extension
//! catalog, or a git repository that already publishes it.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API group of the custom resource.
pub const API_GROUP: &str = "ai-platform.suse.com";

/// API version of the custom resource.
pub const API_VERSION: &str = "v1alpha1";

/// Desired state of an `InstallAIExtension`.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "ai-platform.suse.com",
    version = "v1alpha1",
    kind = "InstallAIExtension",
    plural = "installaiextensions",
    status = "InstallAIExtensionStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct InstallAIExtensionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm: Option<HelmSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<RepoSpec>,

    pub extension: ExtensionSpec,
}

/// A Helm chart that deploys the extension's catalog server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HelmSpec {
    /// Chart name. Also used as the release name and the `ClusterRepo` name.
    pub name: String,

    /// URL of the Helm repository or OCI registry, e.g.
    /// `oci://ghcr.io/my-org/charts` or `https://charts.example.com`.
    #[schemars(length(min = 1))]
    pub url: String,

    pub version: String,

    /// Value overrides passed to the chart.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, serde_json::Value>,
}

/// A git repository publishing built extensions under `extensions/<name>/<version>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepoSpec {
    pub url: String,

    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

/// The UI extension to register.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionSpec {
    #[schemars(length(min = 1))]
    pub name: String,

    #[schemars(length(min = 1))]
    pub version: String,

    /// Catalog annotations that override the ones published in the chart index.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Observed state of an `InstallAIExtension`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstallAIExtensionStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<ExtensionPhase>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Lifecycle phase reported in the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ExtensionPhase {
    /// Waiting on a prerequisite that is expected to appear.
    Pending,
    /// Release and catalog resources are in place.
    Ready,
    /// Reconciliation failed; see the status message.
    Failed,
}

impl std::fmt::Display for ExtensionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Ready => write!(f, "Ready"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}
