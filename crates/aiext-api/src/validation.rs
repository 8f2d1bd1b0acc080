//! Installation source validation.

use crate::error::{Error, Result};
use crate::types::InstallAIExtensionSpec;

/// Where the extension is installed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A Helm release serves the extension catalog.
    Helm,
    /// A git repository serves the extension catalog.
    Repo,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Helm => "helm",
            Self::Repo => "repo",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the declared source kind, or [`Error::InvalidSpec`] unless exactly
/// one of `helm` and `repo` is set and the extension has a name and version.
pub fn validate_spec(spec: &InstallAIExtensionSpec) -> Result<SourceKind> {
    let source = source_kind(spec)?;
    if spec.extension.name.is_empty() {
        return Err(Error::InvalidSpec {
            reason: "extension.name must not be empty".to_string(),
        });
    }
    if spec.extension.version.is_empty() {
        return Err(Error::InvalidSpec {
            reason: "extension.version must not be empty".to_string(),
        });
    }
    Ok(source)
}

fn source_kind(spec: &InstallAIExtensionSpec) -> Result<SourceKind> {
    match (spec.helm.is_some(), spec.repo.is_some()) {
        (true, true) => Err(Error::InvalidSpec {
            reason: "only one of helm or repo may be set".to_string(),
        }),
        (true, false) => Ok(SourceKind::Helm),
        (false, true) => Ok(SourceKind::Repo),
        (false, false) => Err(Error::InvalidSpec {
            reason: "either helm or repo must be set".to_string(),
        }),
    }
}
