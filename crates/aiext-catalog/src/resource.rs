//! Typed views of the Rancher catalog resources the operator manages.
//!
//! The cluster API treats them as dynamic objects. Here each kind has a
//! typed spec holding only the fields the operator owns; conversion to JSON
//! gives the full object for creation and the managed subtree for patching.

use std::collections::BTreeMap;
use std::fmt;

use kube::discovery::ApiResource;
use serde::Serialize;
use serde_json::{Value, json};

use crate::merge;

pub const CATALOG_GROUP: &str = "catalog.cattle.io";
pub const CATALOG_VERSION: &str = "v1";

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY: &str = "aiext-operator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    /// Cluster-scoped pointer to a Helm repository.
    ClusterRepo,
    /// Namespaced registration of a UI extension endpoint.
    UIPlugin,
}

impl CatalogKind {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClusterRepo => "ClusterRepo",
            Self::UIPlugin => "UIPlugin",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            Self::ClusterRepo => "clusterrepos",
            Self::UIPlugin => "uiplugins",
        }
    }

    pub fn namespaced(&self) -> bool {
        matches!(self, Self::UIPlugin)
    }

    pub fn api_version(&self) -> String {
        format!("{}/{}", CATALOG_GROUP, CATALOG_VERSION)
    }

    /// Fully-qualified CRD name, e.g. `uiplugins.catalog.cattle.io`.
    pub fn crd_name(&self) -> String {
        format!("{}.{}", self.plural(), CATALOG_GROUP)
    }

    pub fn api_resource(&self) -> ApiResource {
        ApiResource {
            group: CATALOG_GROUP.to_string(),
            version: CATALOG_VERSION.to_string(),
            api_version: self.api_version(),
            kind: self.kind().to_string(),
            plural: self.plural().to_string(),
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Operator-owned part of a `ClusterRepo` spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterRepoSpec {
    pub url: String,
}

/// Operator-owned part of a `UIPlugin` spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UIPluginSpec {
    pub plugin: PluginSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSpec {
    pub name: String,
    pub version: String,
    pub endpoint: String,
    pub no_cache: bool,
    pub metadata: BTreeMap<String, String>,
}

/// A catalog resource in its desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogResource {
    ClusterRepo {
        name: String,
        spec: ClusterRepoSpec,
    },
    UIPlugin {
        name: String,
        namespace: String,
        spec: UIPluginSpec,
    },
}

impl CatalogResource {
    pub fn kind(&self) -> CatalogKind {
        match self {
            Self::ClusterRepo { .. } => CatalogKind::ClusterRepo,
            Self::UIPlugin { .. } => CatalogKind::UIPlugin,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::ClusterRepo { name, .. } | Self::UIPlugin { name, .. } => name,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            Self::ClusterRepo { .. } => None,
            Self::UIPlugin { namespace, .. } => Some(namespace),
        }
    }

    /// `Kind/name` or `Kind/namespace/name`, for logs and errors.
    pub fn display_id(&self) -> String {
        resource_id(self.kind(), self.namespace(), self.name())
    }

    fn spec_value(&self) -> Value {
        let spec = match self {
            Self::ClusterRepo { spec, .. } => serde_json::to_value(spec),
            Self::UIPlugin { spec, .. } => serde_json::to_value(spec),
        };
        // Plain structs of strings, bools and string maps always serialize.
        spec.unwrap_or(Value::Null)
    }

    /// The complete object to create when the resource does not exist.
    pub fn to_object(&self) -> Value {
        let mut metadata = json!({
            "name": self.name(),
            "labels": { MANAGED_BY_LABEL: MANAGED_BY },
        });
        if let Some(namespace) = self.namespace() {
            metadata["namespace"] = Value::String(namespace.to_string());
        }
        json!({
            "apiVersion": self.kind().api_version(),
            "kind": self.kind().kind(),
            "metadata": metadata,
            "spec": self.spec_value(),
        })
    }

    /// Merge patch bringing `current` in line with the owned fields, or
    /// `None` when it already matches.
    pub fn managed_patch(&self, current: &Value) -> Option<Value> {
        let desired = json!({ "spec": self.spec_value() });
        let patch = merge::diff(current, &desired);
        match self {
            Self::ClusterRepo { .. } => patch,
            // The annotation set is owned as a whole.
            Self::UIPlugin { .. } => {
                merge::remove_stale_keys(patch, current, &desired, &["spec", "plugin", "metadata"])
            }
        }
    }
}

pub fn resource_id(kind: CatalogKind, namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(namespace) => format!("{}/{}/{}", kind, namespace, name),
        None => format!("{}/{}", kind, name),
    }
}
