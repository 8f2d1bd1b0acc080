//! Release manager behaviour against an in-memory Helm.

use std::sync::Arc;
use std::time::Duration;

use aiext_helm::{
    ChartReference, DeletionPropagation, Error, ReleaseAction, ReleaseManager, ReleaseSpec,
    ReleaseStatus,
};
use aiext_test_utils::{BackendCall, FakeReleaseBackend};
use pretty_assertions::assert_eq;
use serde_json::json;

const NAMESPACE: &str = "cattle-ui-plugin-system";

fn spec(name: &str, version: &str) -> ReleaseSpec {
    ReleaseSpec {
        name: name.to_string(),
        namespace: NAMESPACE.to_string(),
        chart: ChartReference::Repository {
            repo_url: "https://charts.example.com".to_string(),
            chart: name.to_string(),
        },
        version: version.to_string(),
        values: serde_json::Map::new(),
    }
}

fn manager(backend: &Arc<FakeReleaseBackend>) -> ReleaseManager {
    ReleaseManager::new(backend.clone(), NAMESPACE)
}

#[tokio::test]
async fn test_first_ensure_installs() {
    let backend = Arc::new(FakeReleaseBackend::new());

    let action = manager(&backend).ensure_release(&spec("acme", "1.0.0")).await.unwrap();

    assert_eq!(action, ReleaseAction::Installed);
    assert_eq!(backend.mutations(), vec![BackendCall::Install("acme".to_string())]);
    let release = backend.release("acme").unwrap();
    assert_eq!(release.chart_version, "1.0.0");
    assert_eq!(release.namespace, NAMESPACE);
}

#[tokio::test]
async fn test_unchanged_spec_is_up_to_date() {
    let backend = Arc::new(FakeReleaseBackend::new());
    let manager = manager(&backend);
    manager.ensure_release(&spec("acme", "1.0.0")).await.unwrap();

    let action = manager.ensure_release(&spec("acme", "1.0.0")).await.unwrap();

    assert_eq!(action, ReleaseAction::UpToDate);
    assert_eq!(backend.mutations().len(), 1);
    assert!(backend.calls().contains(&BackendCall::Render("acme".to_string())));
}

#[tokio::test]
async fn test_changed_values_trigger_upgrade() {
    let backend = Arc::new(FakeReleaseBackend::new());
    let manager = manager(&backend);
    manager.ensure_release(&spec("acme", "1.0.0")).await.unwrap();

    let mut changed = spec("acme", "1.0.0");
    changed.values.insert("replicas".to_string(), json!(3));
    let action = manager.ensure_release(&changed).await.unwrap();

    assert_eq!(action, ReleaseAction::Upgraded);
    assert_eq!(
        backend.mutations().last(),
        Some(&BackendCall::Upgrade {
            release: "acme".to_string(),
            atomic: false,
        })
    );
    assert_eq!(backend.release("acme").unwrap().revision, 2);
}

#[tokio::test]
async fn test_drifted_manifest_triggers_upgrade() {
    let backend = Arc::new(FakeReleaseBackend::new());
    backend.seed(&spec("acme", "1.0.0"));
    backend.set_deployed_manifest("acme", "edited: by-hand\n");

    let action = manager(&backend).ensure_release(&spec("acme", "1.0.0")).await.unwrap();

    assert_eq!(action, ReleaseAction::Upgraded);
}

#[tokio::test]
async fn test_unreadable_manifest_is_treated_as_drift() {
    let backend = Arc::new(FakeReleaseBackend::new());
    backend.seed(&spec("acme", "1.0.0"));
    backend.fail("deployed_manifest");

    let action = manager(&backend).ensure_release(&spec("acme", "1.0.0")).await.unwrap();

    assert_eq!(action, ReleaseAction::Upgraded);
}

#[tokio::test]
async fn test_failed_lookup_is_treated_as_absent() {
    let backend = Arc::new(FakeReleaseBackend::new());
    backend.fail("latest_release");

    let action = manager(&backend).ensure_release(&spec("acme", "1.0.0")).await.unwrap();

    assert_eq!(action, ReleaseAction::Installed);
}

#[tokio::test]
async fn test_failed_upgrade_is_returned_without_rollback() {
    let backend = Arc::new(FakeReleaseBackend::new());
    backend.seed(&spec("acme", "1.0.0"));
    backend.fail("upgrade");

    let err = manager(&backend)
        .ensure_release(&spec("acme", "2.0.0"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Backend { operation: "upgrade", .. }), "{err}");
    assert_eq!(
        backend.mutations(),
        vec![BackendCall::Upgrade {
            release: "acme".to_string(),
            atomic: false,
        }]
    );
    assert_eq!(backend.release("acme").unwrap().chart_version, "1.0.0");
}

#[tokio::test]
async fn test_failed_install_is_returned() {
    let backend = Arc::new(FakeReleaseBackend::new());
    backend.fail("install");

    let err = manager(&backend)
        .ensure_release(&spec("acme", "1.0.0"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Backend { operation: "install", .. }));
    assert!(backend.release("acme").is_none());
}

#[tokio::test]
async fn test_missing_chart_dependencies_block_install() {
    let backend = Arc::new(FakeReleaseBackend::new().with_chart_dependencies(&["redis", "common"]));

    let err = manager(&backend)
        .ensure_release(&spec("acme", "1.0.0"))
        .await
        .unwrap_err();

    match err {
        Error::MissingDependencies { chart, missing } => {
            assert_eq!(chart, "acme");
            assert_eq!(missing, vec!["redis".to_string(), "common".to_string()]);
        }
        other => panic!("expected MissingDependencies, got {other}"),
    }
    assert!(backend.mutations().is_empty());
}

#[tokio::test]
async fn test_failed_pull_is_a_locate_error() {
    let backend = Arc::new(FakeReleaseBackend::new());
    backend.fail("pull");

    let err = manager(&backend)
        .ensure_release(&spec("acme", "1.0.0"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ChartLocate { .. }));
    assert!(err.is_resolution());
}

#[tokio::test]
async fn test_same_release_is_never_worked_on_concurrently() {
    let backend = Arc::new(FakeReleaseBackend::new().with_delay(Duration::from_millis(10)));
    let manager = manager(&backend);
    let spec = spec("acme", "1.0.0");

    let (a, b, c) = tokio::join!(
        manager.ensure_release(&spec),
        manager.ensure_release(&spec),
        manager.ensure_release(&spec),
    );

    let mut actions = vec![a.unwrap(), b.unwrap(), c.unwrap()];
    actions.sort_by_key(|action| *action != ReleaseAction::Installed);
    assert_eq!(
        actions,
        vec![ReleaseAction::Installed, ReleaseAction::UpToDate, ReleaseAction::UpToDate]
    );
    assert_eq!(backend.max_concurrent("acme"), 1);
    assert_eq!(backend.mutations().len(), 1);
}

#[tokio::test]
async fn test_different_releases_proceed_in_parallel() {
    let backend = Arc::new(FakeReleaseBackend::new().with_delay(Duration::from_millis(20)));
    let manager = manager(&backend);

    let spec_acme = spec("acme", "1.0.0");
    let spec_globex = spec("globex", "1.0.0");
    let (a, b) = tokio::join!(
        manager.ensure_release(&spec_acme),
        manager.ensure_release(&spec_globex),
    );

    a.unwrap();
    b.unwrap();
    assert_eq!(backend.max_concurrent("acme"), 1);
    assert_eq!(backend.max_concurrent("globex"), 1);
    assert_eq!(backend.max_concurrent_total(), 2);
}

#[tokio::test]
async fn test_delete_uses_foreground_propagation() {
    let backend = Arc::new(FakeReleaseBackend::new());
    backend.seed(&spec("acme", "1.0.0"));

    manager(&backend).delete_release("acme").await.unwrap();

    assert!(backend.release("acme").is_none());
    assert_eq!(
        backend.mutations(),
        vec![BackendCall::Uninstall("acme".to_string(), DeletionPropagation::Foreground)]
    );
}

#[tokio::test]
async fn test_delete_of_missing_release_succeeds() {
    let backend = Arc::new(FakeReleaseBackend::new());
    manager(&backend).delete_release("acme").await.unwrap();
}

#[tokio::test]
async fn test_delete_failure_is_returned() {
    let backend = Arc::new(FakeReleaseBackend::new());
    backend.seed(&spec("acme", "1.0.0"));
    backend.fail("uninstall");

    assert!(manager(&backend).delete_release("acme").await.is_err());
}

#[tokio::test]
async fn test_get_release_reports_deployed_revision() {
    let backend = Arc::new(FakeReleaseBackend::new());
    let manager = manager(&backend);
    assert_eq!(manager.get_release("acme").await.unwrap(), None);

    manager.ensure_release(&spec("acme", "1.0.0")).await.unwrap();
    let info = manager.get_release("acme").await.unwrap().unwrap();

    assert_eq!(info.chart_name, "acme");
    assert_eq!(info.version, "1.0.0");
    assert_eq!(info.revision, 1);
    assert_eq!(info.status, ReleaseStatus::Deployed);
}

#[tokio::test]
async fn test_get_release_lookup_failure_is_none() {
    let backend = Arc::new(FakeReleaseBackend::new());
    backend.seed(&spec("acme", "1.0.0"));
    backend.fail("latest_release");

    assert_eq!(manager(&backend).get_release("acme").await.unwrap(), None);
}
