//! In-memory [`ReleaseBackend`].
//!
//! Manifests are rendered deterministically from the release spec, so the
//! same spec always renders the same manifest and a changed version or
//! values renders a different one.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use aiext_helm::{
    ChartReference, DeletionPropagation, Error, ReleaseBackend, ReleaseRecord, ReleaseSpec,
    ReleaseStatus, Result, UpgradeOptions,
};
use async_trait::async_trait;

use crate::chart::write_chart;

/// One call made against the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    LatestRelease(String),
    DeployedManifest(String),
    Pull(String),
    Install(String),
    Render(String),
    Upgrade { release: String, atomic: bool },
    Uninstall(String, DeletionPropagation),
}

#[derive(Default)]
struct State {
    releases: HashMap<String, ReleaseRecord>,
    calls: Vec<BackendCall>,
    failing: HashSet<&'static str>,
    in_flight: HashMap<String, usize>,
    max_in_flight: HashMap<String, usize>,
    total_in_flight: usize,
    max_total_in_flight: usize,
}

/// A Helm stand-in that keeps releases in memory.
///
/// Operation names accepted by [`Self::fail`]: `"latest_release"`,
/// `"deployed_manifest"`, `"pull"`, `"install"`, `"render"`, `"upgrade"`,
/// `"uninstall"`.
#[derive(Default)]
pub struct FakeReleaseBackend {
    state: Mutex<State>,
    delay: Duration,
    chart_dependencies: Vec<&'static str>,
}

/// Decrements the in-flight counters when an operation ends.
struct InFlight<'a> {
    backend: &'a FakeReleaseBackend,
    release: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.backend.state();
        if let Some(count) = state.in_flight.get_mut(&self.release) {
            *count -= 1;
        }
        state.total_in_flight -= 1;
    }
}

impl FakeReleaseBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every operation for `delay`, so overlapping calls are observable.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Pulled charts declare these dependencies without vendoring them.
    pub fn with_chart_dependencies(mut self, dependencies: &[&'static str]) -> Self {
        self.chart_dependencies = dependencies.to_vec();
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Make every later call of `operation` fail.
    pub fn fail(&self, operation: &'static str) {
        self.state().failing.insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.state().failing.remove(operation);
    }

    /// Seed an existing release as if installed from `spec`.
    pub fn seed(&self, spec: &ReleaseSpec) {
        let record = record(spec, 1, render(spec));
        self.state().releases.insert(spec.name.clone(), record);
    }

    /// Replace the deployed manifest of `name`, simulating drift.
    pub fn set_deployed_manifest(&self, name: &str, manifest: &str) {
        if let Some(release) = self.state().releases.get_mut(name) {
            release.manifest = manifest.to_string();
        }
    }

    pub fn release(&self, name: &str) -> Option<ReleaseRecord> {
        self.state().releases.get(name).cloned()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state().calls.clone()
    }

    /// Calls that change release state (install, upgrade, uninstall).
    pub fn mutations(&self) -> Vec<BackendCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    BackendCall::Install(_) | BackendCall::Upgrade { .. } | BackendCall::Uninstall(..)
                )
            })
            .collect()
    }

    /// Highest number of overlapping operations observed for `release`.
    pub fn max_concurrent(&self, release: &str) -> usize {
        self.state().max_in_flight.get(release).copied().unwrap_or(0)
    }

    /// Highest number of overlapping operations observed across all releases.
    pub fn max_concurrent_total(&self) -> usize {
        self.state().max_total_in_flight
    }

    async fn enter(
        &self,
        operation: &'static str,
        release: &str,
        call: BackendCall,
    ) -> Result<InFlight<'_>> {
        {
            let mut state = self.state();
            state.calls.push(call);
            let count = state.in_flight.entry(release.to_string()).or_default();
            *count += 1;
            let count = *count;
            let max = state.max_in_flight.entry(release.to_string()).or_default();
            *max = (*max).max(count);
            state.total_in_flight += 1;
            state.max_total_in_flight = state.max_total_in_flight.max(state.total_in_flight);
        }
        let guard = InFlight {
            backend: self,
            release: release.to_string(),
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.state().failing.contains(operation) {
            return Err(Error::Backend {
                operation,
                release: release.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(guard)
    }
}

/// The manifest the fake renders for `spec`.
pub fn render(spec: &ReleaseSpec) -> String {
    format!(
        "# Source: {chart}/templates/deployment.yaml\nname: {name}\nversion: {version}\nvalues: {values}\n",
        chart = spec.chart.chart_name(),
        name = spec.name,
        version = spec.version,
        values = serde_json::Value::Object(spec.values.clone()),
    )
}

fn record(spec: &ReleaseSpec, revision: u32, manifest: String) -> ReleaseRecord {
    ReleaseRecord {
        name: spec.name.clone(),
        namespace: spec.namespace.clone(),
        revision,
        status: ReleaseStatus::Deployed,
        chart_name: spec.chart.chart_name().to_string(),
        chart_version: spec.version.clone(),
        values: spec.values.clone(),
        manifest,
    }
}

#[async_trait]
impl ReleaseBackend for FakeReleaseBackend {
    async fn latest_release(&self, name: &str, _namespace: &str) -> Result<Option<ReleaseRecord>> {
        let _guard = self
            .enter("latest_release", name, BackendCall::LatestRelease(name.to_string()))
            .await?;
        Ok(self.release(name))
    }

    async fn deployed_manifest(&self, name: &str, _namespace: &str) -> Result<String> {
        let _guard = self
            .enter("deployed_manifest", name, BackendCall::DeployedManifest(name.to_string()))
            .await?;
        self.release(name)
            .map(|release| release.manifest)
            .ok_or_else(|| Error::ReleaseNotFound {
                name: name.to_string(),
            })
    }

    async fn pull_chart(
        &self,
        reference: &ChartReference,
        version: &str,
        dest: &Path,
    ) -> Result<PathBuf> {
        let chart = reference.chart_name();
        let _guard = self
            .enter("pull", chart, BackendCall::Pull(reference.to_string()))
            .await
            .map_err(|e| Error::ChartLocate {
                reference: reference.to_string(),
                message: e.to_string(),
            })?;
        Ok(write_chart(
            &dest.join(chart),
            chart,
            version,
            &self.chart_dependencies,
        ))
    }

    async fn install(
        &self,
        spec: &ReleaseSpec,
        _chart_path: &Path,
        _timeout: Duration,
    ) -> Result<ReleaseRecord> {
        let _guard = self
            .enter("install", &spec.name, BackendCall::Install(spec.name.clone()))
            .await?;
        let installed = record(spec, 1, render(spec));
        self.state()
            .releases
            .insert(spec.name.clone(), installed.clone());
        Ok(installed)
    }

    async fn upgrade(
        &self,
        spec: &ReleaseSpec,
        _chart_path: &Path,
        options: UpgradeOptions,
    ) -> Result<ReleaseRecord> {
        let revision = self.release(&spec.name).map(|r| r.revision).unwrap_or(0) + 1;

        if options.dry_run {
            let _guard = self
                .enter("render", &spec.name, BackendCall::Render(spec.name.clone()))
                .await?;
            return Ok(record(spec, revision, render(spec)));
        }

        let _guard = self
            .enter(
                "upgrade",
                &spec.name,
                BackendCall::Upgrade {
                    release: spec.name.clone(),
                    atomic: options.atomic,
                },
            )
            .await?;
        let upgraded = record(spec, revision, render(spec));
        self.state()
            .releases
            .insert(spec.name.clone(), upgraded.clone());
        Ok(upgraded)
    }

    async fn uninstall(
        &self,
        name: &str,
        _namespace: &str,
        propagation: DeletionPropagation,
    ) -> Result<()> {
        let _guard = self
            .enter("uninstall", name, BackendCall::Uninstall(name.to_string(), propagation))
            .await?;
        match self.state().releases.remove(name) {
            Some(_) => Ok(()),
            None => Err(Error::ReleaseNotFound {
                name: name.to_string(),
            }),
        }
    }
}
