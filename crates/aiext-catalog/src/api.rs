//! Cluster API seams used by the catalog manager.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::resource::CatalogKind;

/// CRUD over catalog resources as untyped JSON objects.
///
/// `namespace` is `None` for cluster-scoped kinds.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch the object, `Ok(None)` when it does not exist.
    async fn get(&self, kind: CatalogKind, namespace: Option<&str>, name: &str)
    -> Result<Option<Value>>;

    async fn create(&self, kind: CatalogKind, namespace: Option<&str>, object: &Value)
    -> Result<Value>;

    /// Apply a JSON merge patch (`application/merge-patch+json`).
    async fn patch_merge(
        &self,
        kind: CatalogKind,
        namespace: Option<&str>,
        name: &str,
        patch: &Value,
    ) -> Result<Value>;

    /// Delete the object. Returns [`crate::Error::NotFound`] when absent.
    async fn delete(&self, kind: CatalogKind, namespace: Option<&str>, name: &str) -> Result<()>;
}

/// Answers whether a CustomResourceDefinition is installed.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// `name` is the fully-qualified CRD name, e.g. `uiplugins.catalog.cattle.io`.
    async fn crd_exists(&self, name: &str) -> Result<bool>;
}
