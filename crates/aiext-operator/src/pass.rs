//! One operator pass over a batch of extensions.
//!
//! A failure on one extension, including a failed status write, is recorded
//! in its [`PassReport`] and the pass moves on to the next.

use aiext_api::{ExtensionPhase, InstallAIExtension, InstallAIExtensionStatus};
use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;
use tracing::error;

use crate::error::Result;
use crate::reconciler::{ReconcileOutcome, Reconciler};

/// Persists the status of an `InstallAIExtension`.
#[async_trait]
pub trait StatusWriter: Send + Sync {
    async fn write_status(
        &self,
        ext: &InstallAIExtension,
        status: &InstallAIExtensionStatus,
    ) -> Result<()>;
}

/// Merge-patches the status subresource.
#[derive(Clone)]
pub struct KubeStatusWriter {
    client: Client,
}

impl KubeStatusWriter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusWriter for KubeStatusWriter {
    async fn write_status(
        &self,
        ext: &InstallAIExtension,
        status: &InstallAIExtensionStatus,
    ) -> Result<()> {
        let api: Api<InstallAIExtension> = Api::all(self.client.clone());
        let patch = json!({ "status": status });
        api.patch_status(&ext.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

/// What happened to one extension.
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    pub name: String,
    /// `None` for cleanup passes.
    pub outcome: Option<ReconcileOutcome>,
    pub ok: bool,
}

/// What a pass does with each extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    Reconcile,
    Cleanup,
}

/// Run `mode` over every extension in order, writing statuses through
/// `status` when given.
pub async fn run_pass(
    reconciler: &Reconciler,
    extensions: &[InstallAIExtension],
    mode: PassMode,
    status: Option<&dyn StatusWriter>,
) -> Vec<PassReport> {
    let mut reports = Vec::with_capacity(extensions.len());
    for ext in extensions {
        let name = ext.name_any();

        if mode == PassMode::Cleanup {
            let ok = match reconciler.cleanup(ext).await {
                Ok(()) => true,
                Err(e) => {
                    error!(extension = %name, error = %e, "Cleanup failed");
                    false
                }
            };
            reports.push(PassReport {
                name,
                outcome: None,
                ok,
            });
            continue;
        }

        let outcome = reconciler.reconcile(ext).await;
        let mut ok = outcome.phase() == Some(ExtensionPhase::Ready);
        if let Some(writer) = status {
            if let Err(e) = writer.write_status(ext, &outcome.status).await {
                error!(extension = %name, error = %e, "Status update failed");
                ok = false;
            }
        }
        reports.push(PassReport {
            name,
            outcome: Some(outcome),
            ok,
        });
    }
    reports
}
