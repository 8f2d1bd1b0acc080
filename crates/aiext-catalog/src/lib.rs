//! Rancher catalog integration for AI extensions.
//!
//! An extension becomes visible in the Rancher UI through two resources:
//!
//! - a cluster-scoped `ClusterRepo` pointing at the chart repository that
//!   serves the extension
//! - a `UIPlugin` in the extension namespace pointing at the plugin bundle
//!
//! [`Manager`] creates and updates both, after checking that their CRDs are
//! installed. Only the fields the operator owns are ever written; see
//! [`resource`] and [`merge`].
//!
//! The cluster is reached through [`CatalogApi`] and [`SchemaRegistry`].
//! [`KubeCatalog`] implements both over a `kube::Client`.

pub mod api;
mod cluster_repo;
pub mod error;
pub mod kube_api;
pub mod manager;
pub mod merge;
pub mod metadata;
pub mod preflight;
pub mod resource;
mod ui_plugin;

pub use api::{CatalogApi, SchemaRegistry};
pub use error::{Error, Result};
pub use kube_api::KubeCatalog;
pub use manager::{Manager, cluster_repo_name, cluster_repo_names, plugin_endpoint};
pub use metadata::{ResolvedMetadata, resolve_metadata};
pub use preflight::check_crds;
pub use resource::{CatalogKind, CatalogResource, ClusterRepoSpec, PluginSpec, UIPluginSpec};
