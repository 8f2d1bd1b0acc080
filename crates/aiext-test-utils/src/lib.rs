//! Shared test fakes for the AI extension operator workspace.
//!
//! Every external system the operator talks to sits behind a trait. This
//! crate provides in-memory implementations that record what was asked of
//! them, so tests can assert on calls as well as on results. It is a
//! dev-dependency only and never published.
//!
//! # Modules
//!
//! - [`helm`]: [`FakeReleaseBackend`], an in-memory Helm with call log and
//!   per-release concurrency tracking
//! - [`catalog`]: [`FakeCatalog`] and [`FakeSchemaRegistry`]
//! - [`index`]: [`FakeIndexFetcher`] serving canned index documents
//! - [`services`]: [`FakeServices`] for release service discovery
//! - [`chart`]: chart directories on disk
//! - [`extension`]: `InstallAIExtension` builders

pub mod catalog;
pub mod chart;
pub mod extension;
pub mod helm;
pub mod index;
pub mod services;

pub use catalog::{CatalogCall, FakeCatalog, FakeSchemaRegistry};
pub use chart::write_chart;
pub use helm::{BackendCall, FakeReleaseBackend};
pub use index::FakeIndexFetcher;
pub use services::{FakeServices, service};
