//! Drives one `InstallAIExtension` to its desired state.
//!
//! A Helm source is installed or upgraded first; its service then becomes the
//! repository URL registered with the catalog. A Git source is registered
//! directly from its raw content URL. Nothing is retried here: the caller
//! acts on the returned [`ReconcileOutcome`].

use std::sync::Arc;
use std::time::Duration;

use aiext_api::{
    ExtensionPhase, HelmSpec, InstallAIExtension, InstallAIExtensionStatus, OperatorConfig,
    SourceKind, logging, validate_spec,
};
use aiext_catalog::Manager;
use aiext_helm::{ChartReference, ReleaseManager, ReleaseSpec, ReleaseTimeouts};
use kube::ResourceExt;
use tracing::{info, warn};

use crate::endpoint::{raw_repository_url, service_url};
use crate::error::{Error, ErrorClass, Result};
use crate::service::{ServiceLookup, service_for_release};

/// Requeue delay after a retriable precondition failure.
pub const PENDING_REQUEUE: Duration = Duration::from_secs(30);

/// Status to persist and whether to try again.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub status: InstallAIExtensionStatus,
    pub requeue_after: Option<Duration>,
}

impl ReconcileOutcome {
    pub fn phase(&self) -> Option<ExtensionPhase> {
        self.status.phase
    }

    /// Map the result of one reconcile pass to a status.
    pub fn from_result(result: &Result<()>) -> Self {
        match result {
            Ok(()) => Self {
                status: status(ExtensionPhase::Ready, String::new()),
                requeue_after: None,
            },
            Err(e) if e.class() == ErrorClass::RetriablePrecondition => Self {
                status: status(ExtensionPhase::Pending, e.to_string()),
                requeue_after: Some(PENDING_REQUEUE),
            },
            Err(e) => Self {
                status: status(ExtensionPhase::Failed, e.to_string()),
                requeue_after: None,
            },
        }
    }
}

fn status(phase: ExtensionPhase, message: String) -> InstallAIExtensionStatus {
    InstallAIExtensionStatus {
        phase: Some(phase),
        message,
    }
}

pub struct Reconciler {
    releases: ReleaseManager,
    catalog: Manager,
    services: Arc<dyn ServiceLookup>,
}

impl Reconciler {
    pub fn new(releases: ReleaseManager, catalog: Manager, services: Arc<dyn ServiceLookup>) -> Self {
        Self {
            releases,
            catalog,
            services,
        }
    }

    /// Release timeouts taken from `config`.
    pub fn timeouts(config: &OperatorConfig) -> ReleaseTimeouts {
        ReleaseTimeouts {
            install: config.install_timeout(),
            upgrade: config.upgrade_timeout(),
            render: config.render_timeout(),
        }
    }

    pub fn releases(&self) -> &ReleaseManager {
        &self.releases
    }

    pub fn catalog(&self) -> &Manager {
        &self.catalog
    }

    /// Namespace of releases and plugin resources.
    pub fn namespace(&self) -> &str {
        self.releases.namespace()
    }

    /// Run one reconcile pass and map it to a status.
    pub async fn reconcile(&self, ext: &InstallAIExtension) -> ReconcileOutcome {
        let result = self.apply(ext).await;
        let outcome = ReconcileOutcome::from_result(&result);
        match &result {
            Ok(()) => info!(extension = %ext.name_any(), "Extension ready"),
            Err(e) => warn!(
                extension = %ext.name_any(),
                phase = ?outcome.phase(),
                error = %e,
                "Extension not ready"
            ),
        }
        outcome
    }

    /// Bring the release (Helm source) and catalog resources of `ext` to
    /// their desired state.
    #[tracing::instrument(
        skip_all,
        fields(component = logging::RECONCILER, extension = %ext.name_any())
    )]
    pub async fn apply(&self, ext: &InstallAIExtension) -> Result<()> {
        let repository_url = match validate_spec(&ext.spec)? {
            SourceKind::Helm => {
                let helm = helm_source(ext)?;
                let action = self
                    .releases
                    .ensure_release(&release_spec(helm, self.namespace())?)
                    .await?;
                info!(?action, release = %helm.name, "Helm release ensured");

                let service =
                    service_for_release(self.services.as_ref(), self.namespace(), &helm.name).await?;
                service_url(&service)?
            }
            SourceKind::Repo => {
                let repo = ext.spec.repo.as_ref().ok_or_else(|| missing_source("repo"))?;
                raw_repository_url(&repo.url, &repo.branch)?
            }
        };

        self.catalog.ensure(ext, &repository_url).await?;
        Ok(())
    }

    /// Remove everything `ext` created: catalog resources first, then the
    /// Helm release. Runs on invalid specs too.
    #[tracing::instrument(
        skip_all,
        fields(component = logging::CLEANUP, extension = %ext.name_any())
    )]
    pub async fn cleanup(&self, ext: &InstallAIExtension) -> Result<()> {
        self.catalog.cleanup(ext).await?;

        if let Some(helm) = ext.spec.helm.as_ref().filter(|h| !h.name.is_empty()) {
            self.releases.delete_release(&helm.name).await?;
        }
        info!("Extension removed");
        Ok(())
    }
}

fn missing_source(field: &str) -> Error {
    aiext_api::Error::InvalidSpec {
        reason: format!("{} must be set", field),
    }
    .into()
}

fn helm_source(ext: &InstallAIExtension) -> Result<&HelmSpec> {
    ext.spec.helm.as_ref().ok_or_else(|| missing_source("helm"))
}

/// Release named after the chart, in `namespace`.
pub fn release_spec(helm: &HelmSpec, namespace: &str) -> Result<ReleaseSpec> {
    Ok(ReleaseSpec {
        name: helm.name.clone(),
        namespace: namespace.to_string(),
        chart: ChartReference::from_source(&helm.url, &helm.name)?,
        version: helm.version.clone(),
        values: helm.values.clone().into_iter().collect(),
    })
}
