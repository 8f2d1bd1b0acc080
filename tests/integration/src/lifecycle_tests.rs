//! Full extension lifecycle: configuration and manifests on disk, reconcile,
//! version bump, removal.

use std::fs;
use std::sync::Arc;

use aiext_api::{ExtensionPhase, InstallAIExtension, OperatorConfig};
use aiext_catalog::metadata::{KEY_DISPLAY_NAME, KEY_RANCHER_VERSION};
use aiext_catalog::{CatalogKind, Manager};
use aiext_helm::{ReleaseAction, ReleaseManager};
use aiext_operator::{Reconciler, load_manifests};
use aiext_test_utils::{
    BackendCall, FakeCatalog, FakeIndexFetcher, FakeReleaseBackend, FakeSchemaRegistry,
    FakeServices, service,
};
use kube::ResourceExt;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const NAMESPACE: &str = "ai-extensions";
const SERVICE_URL: &str = "http://suse-ai-catalog.ai-extensions.svc.cluster.local:8080";
const RAW_URL: &str = "https://raw.githubusercontent.com/acme/ui-extensions/release";

const CONFIG: &str = r#"
extension_namespace = "from-file"
upgrade_timeout_secs = 30
"#;

const MANIFESTS: &str = r#"
apiVersion: ai-platform.suse.com/v1alpha1
kind: InstallAIExtension
metadata:
  name: suse-ai
spec:
  helm:
    name: suse-ai-catalog
    url: https://charts.example.com/
    version: 1.0.0
    values:
      replicas: 1
  extension:
    name: suse-ai-catalog
    version: 1.0.0
---
apiVersion: ai-platform.suse.com/v1alpha1
kind: InstallAIExtension
metadata:
  name: dashboards
spec:
  repo:
    url: https://github.com/acme/ui-extensions.git
    branch: release
  extension:
    name: dashboards
    version: 2.4.0
    metadata:
      catalog.cattle.io/display-name: Team Dashboards
"#;

struct Cluster {
    backend: Arc<FakeReleaseBackend>,
    catalog: Arc<FakeCatalog>,
    fetcher: Arc<FakeIndexFetcher>,
    reconciler: Reconciler,
}

/// Load configuration with `EXTENSION_NAMESPACE` set, as in a deployment.
fn load_config(dir: &TempDir) -> OperatorConfig {
    let path = dir.path().join("operator.toml");
    fs::write(&path, CONFIG).unwrap();
    OperatorConfig::from_file(&path)
        .unwrap()
        .with_env(|key| (key == "EXTENSION_NAMESPACE").then(|| NAMESPACE.to_string()))
}

fn load_extensions(dir: &TempDir) -> Vec<InstallAIExtension> {
    let path = dir.path().join("extensions.yaml");
    fs::write(&path, MANIFESTS).unwrap();
    load_manifests(&path).unwrap()
}

fn cluster(config: &OperatorConfig, schemas: FakeSchemaRegistry) -> Cluster {
    let backend = Arc::new(FakeReleaseBackend::new());
    let catalog = Arc::new(FakeCatalog::new());
    let fetcher = Arc::new(
        FakeIndexFetcher::new()
            .with_chart(
                SERVICE_URL,
                "suse-ai-catalog",
                "1.0.0",
                &[(KEY_DISPLAY_NAME, "SUSE AI"), (KEY_RANCHER_VERSION, ">= 2.10.0")],
            )
            .with_chart(RAW_URL, "dashboards", "2.4.0", &[(KEY_DISPLAY_NAME, "Dashboards")]),
    );
    let services = Arc::new(FakeServices::new().with_service(service(
        "suse-ai-catalog",
        NAMESPACE,
        "suse-ai-catalog",
        &[8080],
    )));

    let releases = ReleaseManager::new(backend.clone(), config.extension_namespace.clone())
        .with_timeouts(Reconciler::timeouts(config));
    let manager = Manager::new(
        catalog.clone(),
        Arc::new(schemas),
        fetcher.clone(),
        config.extension_namespace.clone(),
    )
    .with_required_crds(config.required_crds.clone());

    Cluster {
        backend,
        catalog,
        fetcher,
        reconciler: Reconciler::new(releases, manager, services),
    }
}

#[tokio::test]
async fn test_install_upgrade_and_remove() {
    let dir = TempDir::new().unwrap();
    let config = load_config(&dir);
    assert_eq!(config.extension_namespace, NAMESPACE);
    assert_eq!(config.upgrade_timeout().as_secs(), 30);

    let mut extensions = load_extensions(&dir);
    let c = cluster(&config, FakeSchemaRegistry::with_catalog_crds());

    // Install both.
    for ext in &extensions {
        let outcome = c.reconciler.reconcile(ext).await;
        assert_eq!(
            outcome.phase(),
            Some(ExtensionPhase::Ready),
            "{}: {}",
            ext.name_any(),
            outcome.status.message
        );
    }
    assert_eq!(c.catalog.len(), 4);
    assert_eq!(c.fetcher.requests(), 2);

    let plugin = c
        .catalog
        .object(CatalogKind::UIPlugin, Some(NAMESPACE), "dashboards")
        .unwrap();
    assert_eq!(plugin["spec"]["plugin"]["metadata"][KEY_DISPLAY_NAME], "Team Dashboards");
    assert_eq!(
        plugin["spec"]["plugin"]["endpoint"],
        format!("{RAW_URL}/extensions/dashboards/2.4.0")
    );

    // Steady state.
    let action = c
        .reconciler
        .releases()
        .ensure_release(&aiext_operator::release_spec(
            extensions[0].spec.helm.as_ref().unwrap(),
            NAMESPACE,
        )
        .unwrap())
        .await
        .unwrap();
    assert_eq!(action, ReleaseAction::UpToDate);

    // Changing chart values upgrades the release in place.
    extensions[0]
        .spec
        .helm
        .as_mut()
        .unwrap()
        .values
        .insert("replicas".to_string(), serde_json::json!(3));
    c.catalog.clear_calls();
    let outcome = c.reconciler.reconcile(&extensions[0]).await;
    assert_eq!(outcome.phase(), Some(ExtensionPhase::Ready));
    assert_eq!(c.backend.release("suse-ai-catalog").unwrap().revision, 2);
    assert!(c.catalog.calls().is_empty());

    // Remove both.
    for ext in &extensions {
        c.reconciler.cleanup(ext).await.unwrap();
    }
    assert!(c.catalog.is_empty());
    assert!(c.backend.release("suse-ai-catalog").is_none());
    assert_eq!(
        c.backend
            .mutations()
            .iter()
            .filter(|call| matches!(call, BackendCall::Uninstall(..)))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_pending_until_catalog_crds_exist() {
    let dir = TempDir::new().unwrap();
    let config = load_config(&dir);
    let extensions = load_extensions(&dir);
    let c = cluster(&config, FakeSchemaRegistry::empty());

    for ext in &extensions {
        let outcome = c.reconciler.reconcile(ext).await;
        assert_eq!(outcome.phase(), Some(ExtensionPhase::Pending));
        assert!(outcome.requeue_after.is_some());
    }

    assert!(c.catalog.is_empty());
    // The Helm release does not depend on the catalog CRDs.
    assert!(c.backend.release("suse-ai-catalog").is_some());
}

#[tokio::test]
async fn test_extra_required_crd_from_config_gates_reconcile() {
    let dir = TempDir::new().unwrap();
    let mut config = load_config(&dir);
    config
        .required_crds
        .push("settings.management.cattle.io".to_string());
    let extensions = load_extensions(&dir);
    let c = cluster(&config, FakeSchemaRegistry::with_catalog_crds());

    let outcome = c.reconciler.reconcile(&extensions[1]).await;

    assert_eq!(outcome.phase(), Some(ExtensionPhase::Pending));
    assert_eq!(
        outcome.status.message,
        "dependency \"settings.management.cattle.io\" is not ready"
    );
}
