//! Helm side of the AI extension operator.
//!
//! - **Index cache**: repository `index.yaml` documents, fetched once per URL
//! - **Chart resolution**: locate, load and dependency-check charts
//! - **Release manager**: install/upgrade/delete with per-release locking
//!
//! Helm itself is reached through [`ReleaseBackend`]; [`HelmCli`] is the
//! production implementation.

pub mod backend;
pub mod chart;
pub mod cli;
pub mod error;
pub mod index;
pub mod index_cache;
pub mod locks;
pub mod release;

pub use backend::{
    DeletionPropagation, ReleaseBackend, ReleaseInfo, ReleaseRecord, ReleaseSpec, ReleaseStatus,
    UpgradeOptions,
};
pub use chart::{ChartDependency, ChartMetadata, ChartReference, LoadedChart, ResolvedChart, resolve_chart};
pub use cli::HelmCli;
pub use error::{Error, Result};
pub use index::{ChartVersion, HttpIndexFetcher, IndexDocument, IndexFetcher};
pub use index_cache::{IndexCache, IndexCacheEntry};
pub use locks::ReleaseLocks;
pub use release::{ReleaseAction, ReleaseManager, ReleaseTimeouts};
