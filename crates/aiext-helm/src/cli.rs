//! [`ReleaseBackend`] backed by the `helm` binary.
//!
//! Every call spawns one `helm` process with `kill_on_drop`, so dropping the
//! calling future terminates the process. Structured output (`-o json`) is
//! parsed into [`ReleaseRecord`]s.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::backend::{
    DeletionPropagation, ReleaseBackend, ReleaseRecord, ReleaseSpec, ReleaseStatus, UpgradeOptions,
};
use crate::chart::ChartReference;
use crate::error::{Error, Result};

/// Extra time granted to the process beyond Helm's own `--timeout`.
const PROCESS_GRACE: Duration = Duration::from_secs(30);

/// Deadline for read-only queries (`status`, `get manifest`).
const QUERY_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct HelmCli {
    binary: PathBuf,
    kube_context: Option<String>,
    registry_config: Option<PathBuf>,
}

impl HelmCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            kube_context: None,
            registry_config: None,
        }
    }

    pub fn with_kube_context(mut self, context: impl Into<String>) -> Self {
        self.kube_context = Some(context.into());
        self
    }

    /// Credentials file for OCI registries.
    pub fn with_registry_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_config = Some(path.into());
        self
    }

    fn global_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(context) = &self.kube_context {
            args.push("--kube-context".into());
            args.push(context.into());
        }
        if let Some(config) = &self.registry_config {
            args.push("--registry-config".into());
            args.push(config.into());
        }
        args
    }

    async fn run(
        &self,
        operation: &'static str,
        release: &str,
        args: Vec<OsString>,
        timeout: Duration,
    ) -> Result<Vec<u8>> {
        tracing::trace!(operation, release, ?args, "Running helm");

        let mut command = Command::new(&self.binary);
        command
            .args(&args)
            .args(self.global_args())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| Error::Timeout {
                operation,
                release: release.to_string(),
                timeout,
            })?
            .map_err(|e| Error::Backend {
                operation,
                release: release.to_string(),
                message: format!("failed to run {}: {}", self.binary.display(), e),
            })?;

        if output.status.success() {
            return Ok(output.stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if is_release_not_found(&stderr) {
            return Err(Error::ReleaseNotFound {
                name: release.to_string(),
            });
        }
        Err(Error::Backend {
            operation,
            release: release.to_string(),
            message: stderr,
        })
    }
}

fn is_release_not_found(stderr: &str) -> bool {
    stderr.contains("release: not found")
}

/// `helm get manifest` prints the stored manifest followed by a newline.
fn printed_manifest(stdout: &[u8]) -> String {
    let manifest = String::from_utf8_lossy(stdout);
    manifest.strip_suffix('\n').unwrap_or(&manifest).to_string()
}

fn timeout_arg(timeout: Duration) -> OsString {
    format!("{}s", timeout.as_secs()).into()
}

/// Write values to a file Helm can read with `--values`.
fn values_file(values: &serde_json::Map<String, serde_json::Value>) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("values-")
        .suffix(".json")
        .tempfile()?;
    // JSON is valid YAML.
    let body = serde_json::to_vec(values).map_err(std::io::Error::other)?;
    file.write_all(&body)?;
    file.flush()?;
    Ok(file)
}

#[async_trait]
impl ReleaseBackend for HelmCli {
    async fn latest_release(&self, name: &str, namespace: &str) -> Result<Option<ReleaseRecord>> {
        let args = vec![
            "status".into(),
            name.into(),
            "--namespace".into(),
            namespace.into(),
            "--output".into(),
            "json".into(),
        ];
        match self.run("status", name, args, QUERY_TIMEOUT).await {
            Ok(stdout) => parse_release("status", name, &stdout).map(Some),
            Err(Error::ReleaseNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn deployed_manifest(&self, name: &str, namespace: &str) -> Result<String> {
        let args = vec![
            "get".into(),
            "manifest".into(),
            name.into(),
            "--namespace".into(),
            namespace.into(),
        ];
        let stdout = self.run("get manifest", name, args, QUERY_TIMEOUT).await?;
        Ok(printed_manifest(&stdout))
    }

    async fn pull_chart(
        &self,
        reference: &ChartReference,
        version: &str,
        dest: &Path,
    ) -> Result<PathBuf> {
        let mut args: Vec<OsString> = vec!["pull".into()];
        match reference {
            ChartReference::Local(path) => return Ok(path.clone()),
            ChartReference::Registry(oci) => args.push(oci.into()),
            ChartReference::Repository { repo_url, chart } => {
                args.push(chart.into());
                args.push("--repo".into());
                args.push(repo_url.into());
            }
        }
        if !version.is_empty() {
            args.push("--version".into());
            args.push(version.into());
        }
        args.push("--untar".into());
        args.push("--untardir".into());
        args.push(dest.into());

        let chart = reference.chart_name();
        self.run("pull", chart, args, QUERY_TIMEOUT)
            .await
            .map_err(|e| Error::ChartLocate {
                reference: reference.to_string(),
                message: e.to_string(),
            })?;
        Ok(dest.join(chart))
    }

    async fn install(
        &self,
        spec: &ReleaseSpec,
        chart_path: &Path,
        timeout: Duration,
    ) -> Result<ReleaseRecord> {
        let values = values_file(&spec.values)?;
        let args = vec![
            "install".into(),
            spec.name.as_str().into(),
            chart_path.into(),
            "--namespace".into(),
            spec.namespace.as_str().into(),
            "--create-namespace".into(),
            "--values".into(),
            values.path().into(),
            "--timeout".into(),
            timeout_arg(timeout),
            "--output".into(),
            "json".into(),
        ];
        let stdout = self
            .run("install", &spec.name, args, timeout + PROCESS_GRACE)
            .await?;
        parse_release("install", &spec.name, &stdout)
    }

    async fn upgrade(
        &self,
        spec: &ReleaseSpec,
        chart_path: &Path,
        options: UpgradeOptions,
    ) -> Result<ReleaseRecord> {
        let values = values_file(&spec.values)?;
        let mut args: Vec<OsString> = vec![
            "upgrade".into(),
            spec.name.as_str().into(),
            chart_path.into(),
            "--namespace".into(),
            spec.namespace.as_str().into(),
            "--values".into(),
            values.path().into(),
            "--timeout".into(),
            timeout_arg(options.timeout),
            "--output".into(),
            "json".into(),
        ];
        if options.dry_run {
            args.push("--dry-run".into());
        }
        if options.wait {
            args.push("--wait".into());
        }
        if options.atomic {
            args.push("--atomic".into());
        }

        let operation = if options.dry_run { "render" } else { "upgrade" };
        let stdout = self
            .run(operation, &spec.name, args, options.timeout + PROCESS_GRACE)
            .await?;
        parse_release(operation, &spec.name, &stdout)
    }

    async fn uninstall(
        &self,
        name: &str,
        namespace: &str,
        propagation: DeletionPropagation,
    ) -> Result<()> {
        let args = vec![
            "uninstall".into(),
            name.into(),
            "--namespace".into(),
            namespace.into(),
            "--cascade".into(),
            propagation.as_str().into(),
            "--wait".into(),
        ];
        self.run("uninstall", name, args, QUERY_TIMEOUT * 5).await?;
        Ok(())
    }
}

/// `helm ... -o json` release document.
#[derive(Debug, Deserialize)]
struct HelmRelease {
    name: String,
    #[serde(default)]
    namespace: String,
    version: u32,
    info: HelmReleaseInfo,
    chart: HelmChart,
    #[serde(default)]
    config: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    manifest: String,
}

#[derive(Debug, Deserialize)]
struct HelmReleaseInfo {
    status: ReleaseStatus,
}

#[derive(Debug, Deserialize)]
struct HelmChart {
    metadata: HelmChartMetadata,
}

#[derive(Debug, Deserialize)]
struct HelmChartMetadata {
    name: String,
    version: String,
}

fn parse_release(operation: &'static str, release: &str, stdout: &[u8]) -> Result<ReleaseRecord> {
    let parsed: HelmRelease = serde_json::from_slice(stdout).map_err(|e| Error::Backend {
        operation,
        release: release.to_string(),
        message: format!("unexpected helm output: {}", e),
    })?;

    Ok(ReleaseRecord {
        name: parsed.name,
        namespace: parsed.namespace,
        revision: parsed.version,
        status: parsed.info.status,
        chart_name: parsed.chart.metadata.name,
        chart_version: parsed.chart.metadata.version,
        values: parsed.config.unwrap_or_default(),
        manifest: parsed.manifest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STATUS_JSON: &str = r#"{
        "name": "catalog",
        "namespace": "cattle-ui-plugin-system",
        "version": 3,
        "info": {"status": "deployed", "description": "Upgrade complete"},
        "chart": {"metadata": {"name": "catalog", "version": "1.2.0", "apiVersion": "v2"}},
        "config": {"replicas": 2},
        "manifest": "---\nkind: Service\n"
    }"#;

    #[test]
    fn test_parse_release_status() {
        let record = parse_release("status", "catalog", STATUS_JSON.as_bytes()).unwrap();

        assert_eq!(record.revision, 3);
        assert_eq!(record.status, ReleaseStatus::Deployed);
        assert_eq!(record.chart_name, "catalog");
        assert_eq!(record.chart_version, "1.2.0");
        assert_eq!(record.values["replicas"], serde_json::json!(2));
        assert_eq!(record.manifest, "---\nkind: Service\n");
    }

    #[test]
    fn test_parse_release_null_config() {
        let json = STATUS_JSON.replace(r#""config": {"replicas": 2}"#, r#""config": null"#);
        let record = parse_release("status", "catalog", json.as_bytes()).unwrap();
        assert!(record.values.is_empty());
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let json = STATUS_JSON.replace("\"deployed\"", "\"something-new\"");
        let record = parse_release("status", "catalog", json.as_bytes()).unwrap();
        assert_eq!(record.status, ReleaseStatus::Unknown);
    }

    #[test]
    fn test_pending_status_is_kebab_case() {
        let json = STATUS_JSON.replace("\"deployed\"", "\"pending-upgrade\"");
        let record = parse_release("status", "catalog", json.as_bytes()).unwrap();
        assert_eq!(record.status, ReleaseStatus::PendingUpgrade);
    }

    #[test]
    fn test_garbage_output_is_backend_error() {
        let err = parse_release("install", "catalog", b"Error: oops").unwrap_err();
        assert!(matches!(err, Error::Backend { operation: "install", .. }));
    }

    #[test]
    fn test_release_not_found_detection() {
        assert!(is_release_not_found("Error: uninstall: Release not loaded: catalog: release: not found"));
        assert!(!is_release_not_found("Error: Kubernetes cluster unreachable"));
    }

    #[test]
    fn test_printed_manifest_drops_one_newline() {
        assert_eq!(printed_manifest(b"---\nkind: Service\n\n"), "---\nkind: Service\n");
        assert_eq!(printed_manifest(b"kind: Service"), "kind: Service");
        assert_eq!(printed_manifest(b""), "");
    }

    #[test]
    fn test_timeout_arg_in_seconds() {
        assert_eq!(timeout_arg(Duration::from_secs(600)), OsString::from("600s"));
    }

    #[test]
    fn test_values_file_contains_json() {
        let mut values = serde_json::Map::new();
        values.insert("replicas".to_string(), serde_json::json!(2));

        let file = values_file(&values).unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(content, r#"{"replicas":2}"#);
    }

    #[tokio::test]
    async fn test_missing_binary_is_backend_error() {
        let helm = HelmCli::new("/nonexistent/helm");
        let err = helm.deployed_manifest("catalog", "default").await.unwrap_err();
        assert!(matches!(err, Error::Backend { .. }));
    }

    #[tokio::test]
    async fn test_local_reference_is_not_pulled() {
        let helm = HelmCli::new("/nonexistent/helm");
        let path = helm
            .pull_chart(
                &ChartReference::Local(PathBuf::from("/charts/catalog")),
                "1.0.0",
                Path::new("/tmp"),
            )
            .await
            .unwrap();
        assert_eq!(path, PathBuf::from("/charts/catalog"));
    }
}
