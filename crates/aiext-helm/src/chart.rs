//! Chart location, loading and dependency validation.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tempfile::TempDir;

use crate::backend::ReleaseBackend;
use crate::error::{Error, Result};

/// Where a chart comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartReference {
    /// A chart directory on disk.
    Local(PathBuf),
    /// A chart in an index-based Helm repository.
    Repository { repo_url: String, chart: String },
    /// A full OCI reference, e.g. `oci://ghcr.io/acme/charts/catalog`.
    Registry(String),
}

impl ChartReference {
    /// Interpret a source URL and chart name using Helm's locate order:
    /// existing local path, then OCI registry, then HTTP(S) repository.
    pub fn from_source(source: &str, chart: &str) -> Result<Self> {
        let local = Path::new(source);
        if local.exists() {
            let nested = local.join(chart);
            let path = if nested.join(CHART_FILE).is_file() {
                nested
            } else {
                local.to_path_buf()
            };
            return Ok(Self::Local(path));
        }

        if source.starts_with("oci://") {
            return Ok(Self::Registry(format!(
                "{}/{}",
                source.trim_end_matches('/'),
                chart
            )));
        }

        if source.starts_with("https://") || source.starts_with("http://") {
            return Ok(Self::Repository {
                repo_url: source.trim_end_matches('/').to_string(),
                chart: chart.to_string(),
            });
        }

        Err(Error::ChartLocate {
            reference: format!("{}/{}", source, chart),
            message: "not a local path, oci:// reference or http(s) repository".to_string(),
        })
    }

    /// Name of the chart directory produced by pulling this reference.
    pub fn chart_name(&self) -> &str {
        match self {
            Self::Local(path) => path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default(),
            Self::Repository { chart, .. } => chart,
            Self::Registry(reference) => reference.rsplit('/').next().unwrap_or(reference),
        }
    }
}

impl fmt::Display for ChartReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Repository { repo_url, chart } => write!(f, "{}/{}", repo_url, chart),
            Self::Registry(reference) => f.write_str(reference),
        }
    }
}

const CHART_FILE: &str = "Chart.yaml";
const SUBCHART_DIR: &str = "charts";

/// The fields of `Chart.yaml` the operator reads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    #[serde(default)]
    pub api_version: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub dependencies: Vec<ChartDependency>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChartDependency {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub alias: Option<String>,
}

/// A chart read from disk together with the subcharts it vendors.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedChart {
    pub metadata: ChartMetadata,
    pub subcharts: BTreeSet<String>,
}

impl LoadedChart {
    /// Declared dependencies with no matching subchart, in declaration order.
    pub fn missing_dependencies(&self) -> Vec<String> {
        self.metadata
            .dependencies
            .iter()
            .filter(|dep| !self.subcharts.contains(&dep.name))
            .map(|dep| dep.name.clone())
            .collect()
    }
}

/// A located, loaded and validated chart.
///
/// Pulled charts live in a temporary directory removed when this value drops.
#[derive(Debug)]
pub struct ResolvedChart {
    pub chart: LoadedChart,
    pub path: PathBuf,
    _workdir: Option<TempDir>,
}

/// Locate `reference` at `version`, load it and check its dependencies.
pub async fn resolve_chart(
    backend: &dyn ReleaseBackend,
    reference: &ChartReference,
    version: &str,
) -> Result<ResolvedChart> {
    let (path, workdir) = match reference {
        ChartReference::Local(path) => (path.clone(), None),
        remote => {
            let workdir = TempDir::new()?;
            let path = backend
                .pull_chart(remote, version, workdir.path())
                .await
                .map_err(|e| match e {
                    locate @ Error::ChartLocate { .. } => locate,
                    other => Error::ChartLocate {
                        reference: remote.to_string(),
                        message: other.to_string(),
                    },
                })?;
            (path, Some(workdir))
        }
    };

    let chart = load_chart(&path)?;
    let missing = chart.missing_dependencies();
    if !missing.is_empty() {
        return Err(Error::MissingDependencies {
            chart: chart.metadata.name.clone(),
            missing,
        });
    }

    tracing::debug!(
        chart = %chart.metadata.name,
        version = %chart.metadata.version,
        path = %path.display(),
        "Resolved Helm chart"
    );

    Ok(ResolvedChart {
        chart,
        path,
        _workdir: workdir,
    })
}

/// Load an unpacked chart directory.
pub fn load_chart(path: &Path) -> Result<LoadedChart> {
    let load_err = |message: String| Error::ChartLoad {
        path: path.to_path_buf(),
        message,
    };

    if !path.is_dir() {
        return Err(load_err("expected an unpacked chart directory".to_string()));
    }

    let metadata = read_metadata(path)?;

    let mut subcharts = BTreeSet::new();
    let subchart_dir = path.join(SUBCHART_DIR);
    if subchart_dir.is_dir() {
        for entry in std::fs::read_dir(&subchart_dir)? {
            let entry = entry?;
            let entry_path = entry.path();
            if entry_path.is_dir() {
                subcharts.insert(read_metadata(&entry_path)?.name);
            } else if let Some(name) = archive_chart_name(&entry_path) {
                subcharts.insert(name);
            }
        }
    }

    Ok(LoadedChart {
        metadata,
        subcharts,
    })
}

fn read_metadata(chart_dir: &Path) -> Result<ChartMetadata> {
    let file = chart_dir.join(CHART_FILE);
    let content = std::fs::read_to_string(&file).map_err(|e| Error::ChartLoad {
        path: file.clone(),
        message: e.to_string(),
    })?;
    serde_yaml::from_str(&content).map_err(|e| Error::ChartLoad {
        path: file,
        message: e.to_string(),
    })
}

/// Chart name of a packaged subchart `<name>-<version>.tgz`.
///
/// The version starts at the first `-` followed by a digit.
fn archive_chart_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let stem = file_name.strip_suffix(".tgz")?;
    let bytes = stem.as_bytes();
    let split = (0..bytes.len().saturating_sub(1))
        .find(|&i| bytes[i] == b'-' && bytes[i + 1].is_ascii_digit())?;
    Some(stem[..split].to_string())
}
