//! Resource types and shared configuration for the AI extension operator.
//!
//! This crate is the bottom layer of the workspace. It defines the
//! `InstallAIExtension` custom resource, validates which installation source
//! a spec declares, and loads the runtime configuration every other crate
//! reads.
//!
//! ```text
//!              aiext-operator
//!                /         \
//!        aiext-helm     aiext-catalog
//!                \         /
//!                 aiext-api
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod types;
pub mod validation;

pub use config::OperatorConfig;
pub use error::{Error, Result};
pub use types::{
    ExtensionPhase, ExtensionSpec, HelmSpec, InstallAIExtension, InstallAIExtensionSpec,
    InstallAIExtensionStatus, RepoSpec,
};
pub use validation::{SourceKind, validate_spec};
