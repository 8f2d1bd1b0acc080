//! Error types for aiext-operator

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Spec(#[from] aiext_api::Error),

    #[error(transparent)]
    Helm(#[from] aiext_helm::Error),

    #[error(transparent)]
    Catalog(#[from] aiext_catalog::Error),

    /// A git repository URL that does not name `<org>/<repo>`.
    #[error("invalid repository URL {url:?}: {reason}")]
    RepositoryUrl { url: String, reason: String },

    #[error("no service found for release {release:?} in namespace {namespace:?}")]
    ServiceNotFound { release: String, namespace: String },

    #[error("service {service} has no ports")]
    ServiceWithoutPorts { service: String },

    #[error("listing services for release {release:?} failed: {message}")]
    ServiceLookup { release: String, message: String },

    #[error("failed to read manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    #[error("failed to load kubeconfig: {message}")]
    KubeConfig { message: String },

    #[error("Kubernetes client error: {0}")]
    Kube(#[from] kube::Error),
}

/// How the reconcile driver should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A prerequisite is expected to appear. Retry later, report Pending.
    RetriablePrecondition,
    /// Chart or version cannot be resolved. Permanent until the spec changes.
    Resolution,
    /// Network, API or Helm process failure.
    Transient,
    /// The spec itself is invalid.
    Validation,
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Catalog(e) if e.is_dependency_not_ready() => ErrorClass::RetriablePrecondition,
            Self::Catalog(aiext_catalog::Error::Helm(e)) | Self::Helm(e) if e.is_resolution() => {
                ErrorClass::Resolution
            }
            Self::Spec(_) | Self::Catalog(aiext_catalog::Error::Spec(_)) | Self::RepositoryUrl { .. } => {
                ErrorClass::Validation
            }
            _ => ErrorClass::Transient,
        }
    }
}
