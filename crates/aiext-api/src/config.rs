//! Runtime configuration for the operator.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables. The environment always wins.
//!
//! ```toml
//! extension_namespace = "cattle-ui-plugin-system"
//! helm_binary = "/usr/local/bin/helm"
//! upgrade_timeout_secs = 900
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Namespace that Rancher watches for `UIPlugin` resources.
pub const DEFAULT_EXTENSION_NAMESPACE: &str = "cattle-ui-plugin-system";

pub const ENV_EXTENSION_NAMESPACE: &str = "EXTENSION_NAMESPACE";
pub const ENV_HELM_BINARY: &str = "HELM_BINARY";

/// CRDs that must exist before catalog resources are created.
pub const DEFAULT_REQUIRED_CRDS: &[&str] = &[
    "uiplugins.catalog.cattle.io",
    "clusterrepos.catalog.cattle.io",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Namespace for Helm releases and `UIPlugin` resources.
    pub extension_namespace: String,
    pub helm_binary: PathBuf,
    pub required_crds: Vec<String>,
    pub install_timeout_secs: u64,
    pub upgrade_timeout_secs: u64,
    /// Deadline for the dry-run render used to detect drift.
    pub render_timeout_secs: u64,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            extension_namespace: DEFAULT_EXTENSION_NAMESPACE.to_string(),
            helm_binary: PathBuf::from("helm"),
            required_crds: DEFAULT_REQUIRED_CRDS.iter().map(|s| s.to_string()).collect(),
            install_timeout_secs: 300,
            upgrade_timeout_secs: 600,
            render_timeout_secs: 120,
        }
    }
}

impl OperatorConfig {
    /// Load configuration from an optional TOML file, then apply the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    /// Parse a TOML config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides through `lookup`. Empty values are ignored.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ns) = lookup(ENV_EXTENSION_NAMESPACE).filter(|v| !v.is_empty()) {
            tracing::debug!(namespace = %ns, "Extension namespace overridden from environment");
            self.extension_namespace = ns;
        }
        if let Some(helm) = lookup(ENV_HELM_BINARY).filter(|v| !v.is_empty()) {
            self.helm_binary = PathBuf::from(helm);
        }
        self
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }

    pub fn upgrade_timeout(&self) -> Duration {
        Duration::from_secs(self.upgrade_timeout_secs)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}
