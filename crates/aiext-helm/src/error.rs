//! Error types for aiext-helm

use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure or non-2xx response while fetching an index.
    #[error("failed to fetch index.yaml from {url}: {message}")]
    IndexFetch { url: String, message: String },

    /// The index document is not valid YAML of the expected shape.
    #[error("failed to parse index.yaml from {url}: {source}")]
    IndexParse {
        url: String,
        source: serde_yaml::Error,
    },

    #[error("chart {chart:?} not found in index")]
    ChartNotInIndex { chart: String },

    #[error("version {version:?} not found for chart {chart:?}")]
    VersionNotInIndex { chart: String, version: String },

    /// The chart reference could not be located or pulled.
    #[error("failed to locate chart {reference}: {message}")]
    ChartLocate { reference: String, message: String },

    /// The located chart could not be read.
    #[error("failed to load chart at {path}: {message}")]
    ChartLoad { path: PathBuf, message: String },

    /// Declared dependencies are absent from the chart's `charts/` directory.
    #[error("missing dependencies for chart {chart:?}: {}", .missing.join(", "))]
    MissingDependencies { chart: String, missing: Vec<String> },

    /// The backend has no release with this name.
    #[error("release {name:?}: not found")]
    ReleaseNotFound { name: String },

    /// The release backend reported a failure.
    #[error("helm {operation} failed for release {release:?}: {message}")]
    Backend {
        operation: &'static str,
        release: String,
        message: String,
    },

    #[error("helm {operation} for release {release:?} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        release: String,
        timeout: Duration,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error is a lookup miss that only a spec change can fix.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Self::ChartNotInIndex { .. }
                | Self::VersionNotInIndex { .. }
                | Self::ChartLocate { .. }
                | Self::MissingDependencies { .. }
        )
    }
}
