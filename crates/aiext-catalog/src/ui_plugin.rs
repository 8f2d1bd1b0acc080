//! `UIPlugin` registration.

use aiext_api::{InstallAIExtension, logging};
use kube::ResourceExt;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::manager::Manager;
use crate::metadata::resolve_metadata;
use crate::resource::{CatalogKind, CatalogResource, PluginSpec, UIPluginSpec};

impl Manager {
    /// Register the plugin bundle of `ext` served at `endpoint`.
    ///
    /// Metadata comes from the index of `repository_url`, overlaid with the
    /// metadata in the extension spec.
    #[tracing::instrument(
        skip(self, ext),
        fields(
            component = logging::UI_PLUGIN,
            extension = %ext.name_any(),
            name = %ext.spec.extension.name,
            namespace = %self.namespace,
        )
    )]
    pub async fn ensure_ui_plugin(
        &self,
        ext: &InstallAIExtension,
        repository_url: &str,
        endpoint: &str,
    ) -> Result<()> {
        info!("Ensuring UIPlugin");
        let plugin = &ext.spec.extension;

        let metadata = resolve_metadata(
            &self.index_cache,
            self.fetcher.as_ref(),
            repository_url,
            &plugin.name,
            &plugin.version,
            &plugin.metadata,
        )
        .await?;

        let desired = CatalogResource::UIPlugin {
            name: plugin.name.clone(),
            namespace: self.namespace.clone(),
            spec: UIPluginSpec {
                plugin: PluginSpec {
                    name: plugin.name.clone(),
                    version: plugin.version.clone(),
                    endpoint: endpoint.to_string(),
                    no_cache: false,
                    metadata,
                },
            },
        };
        self.apply(&desired).await?;
        debug!("UIPlugin ensured");
        Ok(())
    }

    #[tracing::instrument(
        skip(self),
        fields(component = logging::UI_PLUGIN, namespace = %self.namespace)
    )]
    pub async fn delete_ui_plugin(&self, name: &str) -> Result<()> {
        info!("Deleting UIPlugin");
        match self
            .api
            .delete(CatalogKind::UIPlugin, Some(&self.namespace), name)
            .await
        {
            Ok(()) => {
                info!("UIPlugin deleted");
                Ok(())
            }
            Err(Error::NotFound { .. }) => {
                debug!("UIPlugin already deleted or not found");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to delete UIPlugin");
                Err(e)
            }
        }
    }
}
