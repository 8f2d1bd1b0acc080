//! Install, upgrade and delete Helm releases.
//!
//! [`ReleaseManager::ensure_release`] converges a release onto a
//! [`ReleaseSpec`]:
//!
//! 1. take the per-release lock
//! 2. no release yet: resolve the chart and install it
//! 3. otherwise render an upgrade in dry-run mode and compare its manifest
//!    with the deployed one
//! 4. identical manifests mean nothing to do, anything else triggers a real
//!    (non-atomic) upgrade
//!
//! Nothing is retried here. The reconcile driver decides when to try again.

use std::sync::Arc;
use std::time::Duration;

use aiext_api::logging;
use tracing::{debug, info, warn};

use crate::backend::{
    DeletionPropagation, ReleaseBackend, ReleaseInfo, ReleaseRecord, ReleaseSpec, UpgradeOptions,
};
use crate::chart::resolve_chart;
use crate::error::{Error, Result};
use crate::locks::ReleaseLocks;

/// Deadlines for each backend operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseTimeouts {
    pub install: Duration,
    pub upgrade: Duration,
    pub render: Duration,
}

impl Default for ReleaseTimeouts {
    fn default() -> Self {
        Self {
            install: Duration::from_secs(5 * 60),
            upgrade: Duration::from_secs(10 * 60),
            render: Duration::from_secs(2 * 60),
        }
    }
}

/// What [`ReleaseManager::ensure_release`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseAction {
    Installed,
    Upgraded,
    UpToDate,
}

pub struct ReleaseManager {
    backend: Arc<dyn ReleaseBackend>,
    /// Namespace used by [`Self::get_release`] and [`Self::delete_release`].
    namespace: String,
    timeouts: ReleaseTimeouts,
    locks: ReleaseLocks,
}

impl ReleaseManager {
    pub fn new(backend: Arc<dyn ReleaseBackend>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            timeouts: ReleaseTimeouts::default(),
            locks: ReleaseLocks::new(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: ReleaseTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Converge the release named `spec.name` onto `spec`.
    ///
    /// Calls for the same release name never overlap. A failed lookup of the
    /// current release is treated as "not installed".
    #[tracing::instrument(
        skip(self, spec),
        fields(component = logging::HELM, name = %spec.name, namespace = %spec.namespace)
    )]
    pub async fn ensure_release(&self, spec: &ReleaseSpec) -> Result<ReleaseAction> {
        let _guard = self.locks.acquire(&spec.name).await;

        let current = match self.backend.latest_release(&spec.name, &spec.namespace).await {
            Ok(current) => current,
            Err(e) => {
                warn!(error = %e, "Release lookup failed, treating release as absent");
                None
            }
        };

        let Some(current) = current else {
            info!("Helm release not found, installing");
            self.install(spec).await?;
            return Ok(ReleaseAction::Installed);
        };

        let deployed = match self
            .backend
            .deployed_manifest(&spec.name, &spec.namespace)
            .await
        {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(error = %e, "Failed to read deployed manifest, assuming drift");
                String::new()
            }
        };

        let chart = resolve_chart(self.backend.as_ref(), &spec.chart, &spec.version).await?;
        let rendered = self
            .backend
            .upgrade(spec, &chart.path, UpgradeOptions::dry_run(self.timeouts.render))
            .await?
            .manifest;

        if !manifests_differ(&deployed, &rendered) {
            info!(revision = current.revision, "Helm release is up-to-date, skipping upgrade");
            return Ok(ReleaseAction::UpToDate);
        }

        info!(
            revision = current.revision,
            version = %spec.version,
            "Detected Helm manifest changes, upgrading"
        );
        let upgraded = self
            .backend
            .upgrade(spec, &chart.path, UpgradeOptions::apply(self.timeouts.upgrade))
            .await
            .inspect_err(|e| warn!(error = %e, "Helm upgrade failed"))?;

        info!(revision = upgraded.revision, "Helm release upgraded successfully");
        Ok(ReleaseAction::Upgraded)
    }

    async fn install(&self, spec: &ReleaseSpec) -> Result<ReleaseRecord> {
        info!(version = %spec.version, chart = %spec.chart, "Installing Helm release");

        let chart = resolve_chart(self.backend.as_ref(), &spec.chart, &spec.version)
            .await
            .inspect_err(|e| warn!(error = %e, "Failed to resolve Helm chart"))?;

        let record = self
            .backend
            .install(spec, &chart.path, self.timeouts.install)
            .await
            .inspect_err(|e| warn!(error = %e, "Helm install failed"))?;

        info!(revision = record.revision, "Helm release installed successfully");
        Ok(record)
    }

    /// Uninstall `name`, waiting on dependents (foreground deletion).
    /// A release that does not exist counts as deleted.
    #[tracing::instrument(
        skip(self),
        fields(component = logging::HELM, namespace = %self.namespace)
    )]
    pub async fn delete_release(&self, name: &str) -> Result<()> {
        match self
            .backend
            .uninstall(name, &self.namespace, DeletionPropagation::Foreground)
            .await
        {
            Ok(()) => {
                info!("Helm release deleted");
                Ok(())
            }
            Err(Error::ReleaseNotFound { .. }) => {
                info!("Helm release already deleted");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to delete Helm release");
                Err(e)
            }
        }
    }

    /// Latest revision of `name`. Lookup failures are reported as `None`,
    /// same as a release that never existed.
    pub async fn get_release(&self, name: &str) -> Result<Option<ReleaseInfo>> {
        match self.backend.latest_release(name, &self.namespace).await {
            Ok(record) => Ok(record.map(ReleaseInfo::from)),
            Err(e) => {
                debug!(name, error = %e, "Release lookup failed");
                Ok(None)
            }
        }
    }
}

/// Manifests are compared as opaque text; reordering alone counts as a change.
fn manifests_differ(deployed: &str, rendered: &str) -> bool {
    deployed != rendered
}
