//! End-to-end reconcile passes over in-memory backends.

use std::sync::Arc;
use std::time::Duration;

use aiext_api::ExtensionPhase;
use aiext_catalog::metadata::KEY_DISPLAY_NAME;
use aiext_catalog::{CatalogKind, Manager};
use aiext_helm::{DeletionPropagation, ReleaseManager};
use aiext_operator::{ErrorClass, PENDING_REQUEUE, Reconciler};
use aiext_test_utils::extension::{helm_extension, repo_extension};
use aiext_test_utils::{
    BackendCall, FakeCatalog, FakeIndexFetcher, FakeReleaseBackend, FakeSchemaRegistry,
    FakeServices, service,
};
use pretty_assertions::assert_eq;

const NAMESPACE: &str = "cattle-ui-plugin-system";
const SERVICE_URL: &str = "http://acme-catalog.cattle-ui-plugin-system.svc.cluster.local:8080";
const RAW_URL: &str = "https://raw.githubusercontent.com/acme/extensions/main";

struct Harness {
    backend: Arc<FakeReleaseBackend>,
    catalog: Arc<FakeCatalog>,
    schemas: Arc<FakeSchemaRegistry>,
    services: Arc<FakeServices>,
    reconciler: Reconciler,
}

fn harness() -> Harness {
    let backend = Arc::new(FakeReleaseBackend::new());
    let catalog = Arc::new(FakeCatalog::new());
    let schemas = Arc::new(FakeSchemaRegistry::with_catalog_crds());
    let fetcher = Arc::new(
        FakeIndexFetcher::new()
            .with_chart(SERVICE_URL, "acme", "1.0.0", &[(KEY_DISPLAY_NAME, "Acme AI")])
            .with_chart(RAW_URL, "observability", "0.3.1", &[]),
    );
    let services = Arc::new(
        FakeServices::new().with_service(service("acme-catalog", NAMESPACE, "acme", &[8080, 9090])),
    );

    let reconciler = Reconciler::new(
        ReleaseManager::new(backend.clone(), NAMESPACE),
        Manager::new(catalog.clone(), schemas.clone(), fetcher, NAMESPACE),
        services.clone(),
    );
    Harness {
        backend,
        catalog,
        schemas,
        services,
        reconciler,
    }
}

fn acme() -> aiext_api::InstallAIExtension {
    helm_extension("acme-object", "acme", "https://charts.example.com", "1.0.0")
}

fn git() -> aiext_api::InstallAIExtension {
    repo_extension(
        "from-git",
        "observability",
        "https://github.com/acme/extensions.git",
        "0.3.1",
    )
}

#[tokio::test]
async fn test_helm_extension_becomes_ready() {
    let h = harness();

    let outcome = h.reconciler.reconcile(&acme()).await;

    assert_eq!(outcome.phase(), Some(ExtensionPhase::Ready), "{}", outcome.status.message);
    assert_eq!(outcome.requeue_after, None);
    assert_eq!(h.backend.release("acme").unwrap().namespace, NAMESPACE);

    let repo = h.catalog.object(CatalogKind::ClusterRepo, None, "acme").unwrap();
    assert_eq!(repo["spec"]["url"], SERVICE_URL);
    let plugin = h
        .catalog
        .object(CatalogKind::UIPlugin, Some(NAMESPACE), "acme")
        .unwrap();
    assert_eq!(
        plugin["spec"]["plugin"]["endpoint"],
        format!("{SERVICE_URL}/plugin/acme-1.0.0")
    );
    assert_eq!(plugin["spec"]["plugin"]["metadata"][KEY_DISPLAY_NAME], "Acme AI");
}

#[tokio::test]
async fn test_second_pass_changes_nothing() {
    let h = harness();
    h.reconciler.reconcile(&acme()).await;
    h.catalog.clear_calls();

    let outcome = h.reconciler.reconcile(&acme()).await;

    assert_eq!(outcome.phase(), Some(ExtensionPhase::Ready));
    assert_eq!(h.backend.mutations().len(), 1);
    assert!(h.catalog.calls().is_empty());
}

#[tokio::test]
async fn test_missing_catalog_crds_report_pending() {
    let h = Harness {
        schemas: Arc::new(FakeSchemaRegistry::empty()),
        ..harness()
    };
    let reconciler = Reconciler::new(
        ReleaseManager::new(h.backend.clone(), NAMESPACE),
        Manager::new(
            h.catalog.clone(),
            h.schemas.clone(),
            Arc::new(FakeIndexFetcher::new()),
            NAMESPACE,
        ),
        h.services.clone(),
    );

    let outcome = reconciler.reconcile(&acme()).await;

    assert_eq!(outcome.phase(), Some(ExtensionPhase::Pending));
    assert_eq!(outcome.requeue_after, Some(PENDING_REQUEUE));
    assert_eq!(
        outcome.status.message,
        "dependency \"uiplugins.catalog.cattle.io\" is not ready"
    );
    assert!(h.catalog.is_empty());
}

#[tokio::test]
async fn test_missing_service_fails() {
    let h = harness();
    let other = helm_extension("globex-object", "globex", "https://charts.example.com", "1.0.0");

    let outcome = h.reconciler.reconcile(&other).await;

    assert_eq!(outcome.phase(), Some(ExtensionPhase::Failed));
    assert_eq!(
        outcome.status.message,
        "no service found for release \"globex\" in namespace \"cattle-ui-plugin-system\""
    );
    assert!(h.catalog.is_empty());
}

#[tokio::test]
async fn test_service_discovered_after_install_is_used_on_next_pass() {
    let h = harness();
    let other = helm_extension("globex-object", "globex", "https://charts.example.com", "1.0.0");
    assert_eq!(
        h.reconciler.reconcile(&other).await.phase(),
        Some(ExtensionPhase::Failed)
    );

    h.services.add(service("globex", NAMESPACE, "globex", &[80]));
    let err = h.reconciler.apply(&other).await.unwrap_err();

    // The service is found; the index at its URL is not published.
    assert_eq!(err.class(), ErrorClass::Transient);
    let repo = h.catalog.object(CatalogKind::ClusterRepo, None, "globex").unwrap();
    assert_eq!(
        repo["spec"]["url"],
        "http://globex.cattle-ui-plugin-system.svc.cluster.local:80"
    );
}

#[tokio::test]
async fn test_both_sources_fail_validation_without_side_effects() {
    let h = harness();
    let mut ext = acme();
    ext.spec.repo = git().spec.repo;

    let outcome = h.reconciler.reconcile(&ext).await;

    assert_eq!(outcome.phase(), Some(ExtensionPhase::Failed));
    assert_eq!(
        outcome.status.message,
        "invalid spec: only one of helm or repo may be set"
    );
    assert!(h.backend.calls().is_empty());
    assert!(h.catalog.is_empty());
}

#[tokio::test]
async fn test_no_source_fails_validation() {
    let h = harness();
    let mut ext = acme();
    ext.spec.helm = None;

    let err = h.reconciler.apply(&ext).await.unwrap_err();

    assert_eq!(err.class(), ErrorClass::Validation);
    assert_eq!(err.to_string(), "invalid spec: either helm or repo must be set");
}

#[tokio::test]
async fn test_git_extension_skips_helm() {
    let h = harness();

    let outcome = h.reconciler.reconcile(&git()).await;

    assert_eq!(outcome.phase(), Some(ExtensionPhase::Ready), "{}", outcome.status.message);
    assert!(h.backend.calls().is_empty());
    let repo = h.catalog.object(CatalogKind::ClusterRepo, None, "from-git").unwrap();
    assert_eq!(repo["spec"]["url"], RAW_URL);
    let plugin = h
        .catalog
        .object(CatalogKind::UIPlugin, Some(NAMESPACE), "observability")
        .unwrap();
    assert_eq!(
        plugin["spec"]["plugin"]["endpoint"],
        format!("{RAW_URL}/extensions/observability/0.3.1")
    );
    assert_eq!(
        plugin["spec"]["plugin"]["metadata"][KEY_DISPLAY_NAME],
        "observability"
    );
}

#[tokio::test]
async fn test_git_url_without_repository_fails() {
    let h = harness();
    let ext = repo_extension("bad", "observability", "https://github.com/acme", "0.3.1");

    let err = h.reconciler.apply(&ext).await.unwrap_err();

    assert_eq!(err.class(), ErrorClass::Validation);
    assert!(h.catalog.is_empty());
}

#[tokio::test]
async fn test_helm_failure_reports_failed() {
    let h = harness();
    h.backend.fail("install");

    let outcome = h.reconciler.reconcile(&acme()).await;

    assert_eq!(outcome.phase(), Some(ExtensionPhase::Failed));
    assert!(outcome.status.message.contains("install"), "{}", outcome.status.message);
    assert!(h.catalog.is_empty());
}

#[tokio::test]
async fn test_cleanup_removes_catalog_then_release() {
    let h = harness();
    h.reconciler.reconcile(&acme()).await;

    h.reconciler.cleanup(&acme()).await.unwrap();

    assert!(h.catalog.is_empty());
    assert!(h.backend.release("acme").is_none());
    assert_eq!(
        h.backend.mutations().last(),
        Some(&BackendCall::Uninstall("acme".to_string(), DeletionPropagation::Foreground))
    );
}

#[tokio::test]
async fn test_cleanup_keeps_release_when_catalog_cleanup_fails() {
    let h = harness();
    h.reconciler.reconcile(&acme()).await;
    h.catalog.fail("delete");

    assert!(h.reconciler.cleanup(&acme()).await.is_err());
    assert!(h.backend.release("acme").is_some());
}

#[tokio::test]
async fn test_cleanup_removes_extension_edited_into_invalid_spec() {
    let h = harness();
    h.reconciler.reconcile(&acme()).await;

    let mut edited = acme();
    edited.spec.repo = git().spec.repo;
    h.reconciler.cleanup(&edited).await.unwrap();

    assert!(h.catalog.is_empty());
    assert!(h.backend.release("acme").is_none());
}

#[tokio::test]
async fn test_cleanup_of_git_extension_does_not_touch_helm() {
    let h = harness();
    h.reconciler.reconcile(&git()).await;

    h.reconciler.cleanup(&git()).await.unwrap();

    assert!(h.catalog.is_empty());
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn test_cleanup_of_never_installed_extension_succeeds() {
    let h = harness();
    h.reconciler.cleanup(&acme()).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_passes_for_one_extension_install_once() {
    let backend = Arc::new(FakeReleaseBackend::new().with_delay(Duration::from_millis(5)));
    let h = harness();
    let reconciler = Reconciler::new(
        ReleaseManager::new(backend.clone(), NAMESPACE),
        Manager::new(
            h.catalog.clone(),
            h.schemas.clone(),
            Arc::new(
                FakeIndexFetcher::new().with_chart(SERVICE_URL, "acme", "1.0.0", &[]),
            ),
            NAMESPACE,
        ),
        h.services.clone(),
    );

    let acme_a = acme();
    let acme_b = acme();
    let (a, b) = tokio::join!(reconciler.reconcile(&acme_a), reconciler.reconcile(&acme_b));

    assert_eq!(a.phase(), Some(ExtensionPhase::Ready));
    assert_eq!(b.phase(), Some(ExtensionPhase::Ready));
    assert_eq!(backend.max_concurrent("acme"), 1);
    assert_eq!(backend.mutations(), vec![BackendCall::Install("acme".to_string())]);
}
