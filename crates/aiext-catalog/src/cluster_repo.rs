//! `ClusterRepo` registration.

use aiext_api::logging;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::manager::Manager;
use crate::resource::{CatalogKind, CatalogResource, ClusterRepoSpec};

impl Manager {
    /// Point the cluster-scoped `ClusterRepo` `name` at `url`.
    #[tracing::instrument(skip(self), fields(component = logging::CLUSTER_REPO))]
    pub async fn ensure_cluster_repo(&self, name: &str, url: &str) -> Result<()> {
        info!("Ensuring ClusterRepo");
        let desired = CatalogResource::ClusterRepo {
            name: name.to_string(),
            spec: ClusterRepoSpec {
                url: url.to_string(),
            },
        };
        self.apply(&desired).await?;
        debug!("ClusterRepo ensured");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(component = logging::CLUSTER_REPO))]
    pub async fn delete_cluster_repo(&self, name: &str) -> Result<()> {
        info!("Deleting ClusterRepo");
        match self.api.delete(CatalogKind::ClusterRepo, None, name).await {
            Ok(()) => {
                info!("ClusterRepo deleted");
                Ok(())
            }
            Err(Error::NotFound { .. }) => {
                debug!("ClusterRepo already deleted or not found");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to delete ClusterRepo");
                Err(e)
            }
        }
    }
}
