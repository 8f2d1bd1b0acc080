//! Error types for aiext-catalog

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required CRD is not installed yet. Retry later instead of failing.
    #[error("dependency {dependency:?} is not ready")]
    DependencyNotReady { dependency: String },

    /// The resource does not exist.
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The Kubernetes API rejected or failed a request.
    #[error("{operation} {resource} failed: {message}")]
    Api {
        operation: &'static str,
        resource: String,
        message: String,
    },

    /// The object returned by the API does not have the expected shape.
    #[error("malformed {resource}: {message}")]
    Malformed { resource: String, message: String },

    /// Index lookup failed while resolving plugin metadata.
    #[error(transparent)]
    Helm(#[from] aiext_helm::Error),

    /// The extension spec is not valid.
    #[error(transparent)]
    Spec(#[from] aiext_api::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_dependency_not_ready(&self) -> bool {
        matches!(self, Self::DependencyNotReady { .. })
    }
}
