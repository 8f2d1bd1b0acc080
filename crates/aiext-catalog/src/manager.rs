//! Catalog registration of an extension.
//!
//! [`Manager::ensure`] runs three steps in order and stops at the first
//! failure:
//!
//! 1. prerequisite check (catalog CRDs installed)
//! 2. `ClusterRepo` pointing at the repository URL
//! 3. `UIPlugin` pointing at the plugin endpoint, carrying the metadata
//!    resolved from the repository index
//!
//! [`Manager::cleanup`] removes the `UIPlugin` first, then the `ClusterRepo`.

use std::sync::Arc;

use aiext_api::config::DEFAULT_REQUIRED_CRDS;
use aiext_api::{InstallAIExtension, SourceKind, logging, validate_spec};
use aiext_helm::{IndexCache, IndexFetcher};
use kube::ResourceExt;
use tracing::{debug, info};

use crate::api::{CatalogApi, SchemaRegistry};
use crate::error::Result;
use crate::preflight::check_crds;
use crate::resource::CatalogResource;

pub struct Manager {
    pub(crate) api: Arc<dyn CatalogApi>,
    schemas: Arc<dyn SchemaRegistry>,
    pub(crate) fetcher: Arc<dyn IndexFetcher>,
    pub(crate) index_cache: IndexCache,
    /// Namespace of `UIPlugin` resources.
    pub(crate) namespace: String,
    required_crds: Vec<String>,
}

impl Manager {
    pub fn new(
        api: Arc<dyn CatalogApi>,
        schemas: Arc<dyn SchemaRegistry>,
        fetcher: Arc<dyn IndexFetcher>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            api,
            schemas,
            fetcher,
            index_cache: IndexCache::new(),
            namespace: namespace.into(),
            required_crds: DEFAULT_REQUIRED_CRDS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_required_crds(mut self, crds: Vec<String>) -> Self {
        self.required_crds = crds;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn index_cache(&self) -> &IndexCache {
        &self.index_cache
    }

    /// Register `ext` with the catalog. `repository_url` is the chart
    /// repository serving the extension: the release's service URL for a
    /// Helm source, the raw content base for a Git source.
    #[tracing::instrument(
        skip_all,
        fields(component = logging::RANCHER, extension = %ext.name_any(), namespace = %self.namespace)
    )]
    pub async fn ensure(&self, ext: &InstallAIExtension, repository_url: &str) -> Result<()> {
        let source = validate_spec(&ext.spec)?;
        info!("Ensuring Rancher resources");

        check_crds(self.schemas.as_ref(), &self.required_crds)
            .await
            .inspect_err(|_| debug!("Rancher CRDs not ready yet"))?;

        self.ensure_cluster_repo(&cluster_repo_name(ext, source), repository_url)
            .await?;

        let endpoint = plugin_endpoint(source, repository_url, &ext.spec.extension.name, &ext.spec.extension.version);
        self.ensure_ui_plugin(ext, repository_url, &endpoint).await?;

        info!("Rancher resources ensured");
        Ok(())
    }

    /// Remove the catalog resources of `ext`. Resources already gone count
    /// as removed.
    ///
    /// The spec is not validated: an object edited into an invalid state is
    /// still torn down, under every name any of its sources could have used.
    #[tracing::instrument(
        skip_all,
        fields(component = logging::CLEANUP, extension = %ext.name_any())
    )]
    pub async fn cleanup(&self, ext: &InstallAIExtension) -> Result<()> {
        info!("Cleaning up Rancher resources");

        let plugin = &ext.spec.extension.name;
        if !plugin.is_empty() {
            self.delete_ui_plugin(plugin).await?;
        }
        for name in cluster_repo_names(ext) {
            self.delete_cluster_repo(&name).await?;
        }

        info!("Rancher cleanup completed");
        Ok(())
    }

    /// Create `desired` when absent, otherwise patch its owned fields.
    /// Returns whether an API write happened.
    pub(crate) async fn apply(&self, desired: &CatalogResource) -> Result<bool> {
        let kind = desired.kind();
        let namespace = desired.namespace();

        let Some(current) = self.api.get(kind, namespace, desired.name()).await? else {
            debug!(resource = %desired.display_id(), "Creating");
            self.api.create(kind, namespace, &desired.to_object()).await?;
            return Ok(true);
        };

        match desired.managed_patch(&current) {
            Some(patch) => {
                debug!(resource = %desired.display_id(), "Patching managed fields");
                self.api
                    .patch_merge(kind, namespace, desired.name(), &patch)
                    .await?;
                Ok(true)
            }
            None => {
                debug!(resource = %desired.display_id(), "Already in sync");
                Ok(false)
            }
        }
    }
}

/// `ClusterRepo` name: the Helm release name, or the extension object name
/// for a Git source.
pub fn cluster_repo_name(ext: &InstallAIExtension, source: SourceKind) -> String {
    match (source, &ext.spec.helm) {
        (SourceKind::Helm, Some(helm)) => helm.name.clone(),
        _ => ext.name_any(),
    }
}

/// Every `ClusterRepo` name `ext` may have created, whichever sources are set.
pub fn cluster_repo_names(ext: &InstallAIExtension) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(helm) = ext.spec.helm.as_ref().filter(|h| !h.name.is_empty()) {
        names.push(helm.name.clone());
    }
    if ext.spec.repo.is_some() {
        let name = cluster_repo_name(ext, SourceKind::Repo);
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Where Rancher loads the plugin bundle from.
pub fn plugin_endpoint(source: SourceKind, repository_url: &str, name: &str, version: &str) -> String {
    let base = repository_url.trim_end_matches('/');
    match source {
        SourceKind::Helm => format!("{}/plugin/{}-{}", base, name, version),
        SourceKind::Repo => format!("{}/extensions/{}/{}", base, name, version),
    }
}
