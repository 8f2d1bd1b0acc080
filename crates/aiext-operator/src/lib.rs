//! Reconciliation of `InstallAIExtension` resources.
//!
//! [`Reconciler`] ties the layers below together: it validates the spec,
//! converges the Helm release through [`aiext_helm::ReleaseManager`],
//! discovers the release's service, and registers the extension with the
//! Rancher catalog through [`aiext_catalog::Manager`].
//!
//! The `aiext-operator` binary runs one pass over extension manifests read
//! from disk.

pub mod endpoint;
pub mod error;
pub mod manifest;
pub mod pass;
pub mod reconciler;
pub mod service;

pub use endpoint::{raw_repository_url, service_url};
pub use error::{Error, ErrorClass, Result};
pub use manifest::load_manifests;
pub use pass::{KubeStatusWriter, PassMode, PassReport, StatusWriter, run_pass};
pub use reconciler::{PENDING_REQUEUE, ReconcileOutcome, Reconciler, release_spec};
pub use service::{INSTANCE_LABEL, KubeServices, ServiceLookup, service_for_release};
