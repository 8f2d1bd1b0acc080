//! AI extension operator
//!
//! Runs one reconcile pass over `InstallAIExtension` manifests.
//!
//! # Usage
//!
//! ```bash
//! aiext-operator [--config <file>] [--cleanup] [--write-status] <manifest>...
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log filter (default: `aiext_operator=info,aiext_helm=info,aiext_catalog=info`)
//! - `EXTENSION_NAMESPACE`: namespace for releases and plugins
//! - `HELM_BINARY`: path of the `helm` executable

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use aiext_api::OperatorConfig;
use aiext_catalog::{KubeCatalog, Manager};
use aiext_helm::{HelmCli, HttpIndexFetcher, ReleaseManager};
use aiext_operator::{KubeServices, KubeStatusWriter, PassMode, Reconciler, load_manifests, run_pass};
use clap::Parser;
use kube::config::KubeConfigOptions;
use kube::{Client, Config};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "aiext_operator=info,aiext_helm=info,aiext_catalog=info";

/// Install Rancher UI extensions from InstallAIExtension manifests
#[derive(Parser)]
#[command(name = "aiext-operator")]
#[command(version)]
struct Args {
    /// Operator configuration file (TOML)
    #[arg(short, long, env = "AIEXT_CONFIG")]
    config: Option<PathBuf>,

    /// Kubeconfig context for both the Kubernetes client and helm
    #[arg(long, env = "AIEXT_KUBE_CONTEXT")]
    kube_context: Option<String>,

    /// Remove the extensions instead of installing them
    #[arg(long)]
    cleanup: bool,

    /// Write the resulting status back to each InstallAIExtension object
    #[arg(long)]
    write_status: bool,

    /// Files containing InstallAIExtension objects
    #[arg(required = true)]
    manifests: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            tracing::error!(error = %e, "Operator run failed");
            ExitCode::FAILURE
        }
    }
}

async fn client(context: Option<&str>) -> aiext_operator::Result<Client> {
    let Some(context) = context else {
        return Ok(Client::try_default().await?);
    };
    let options = KubeConfigOptions {
        context: Some(context.to_string()),
        ..Default::default()
    };
    let config = Config::from_kubeconfig(&options)
        .await
        .map_err(|e| aiext_operator::Error::KubeConfig {
            message: e.to_string(),
        })?;
    Ok(Client::try_from(config)?)
}

/// Returns whether every extension reached its target state.
async fn run(args: Args) -> aiext_operator::Result<bool> {
    let config = OperatorConfig::load(args.config.as_deref())?;
    tracing::info!(
        namespace = %config.extension_namespace,
        helm = %config.helm_binary.display(),
        "Starting aiext-operator"
    );

    let client = client(args.kube_context.as_deref()).await?;

    let mut helm = HelmCli::new(config.helm_binary.clone());
    if let Some(context) = &args.kube_context {
        helm = helm.with_kube_context(context.clone());
    }
    let releases = ReleaseManager::new(Arc::new(helm), config.extension_namespace.clone())
        .with_timeouts(Reconciler::timeouts(&config));

    let cluster = Arc::new(KubeCatalog::new(client.clone()));
    let catalog = Manager::new(
        cluster.clone(),
        cluster,
        Arc::new(HttpIndexFetcher::new()),
        config.extension_namespace.clone(),
    )
    .with_required_crds(config.required_crds.clone());

    let reconciler = Reconciler::new(releases, catalog, Arc::new(KubeServices::new(client.clone())));

    let mut extensions = Vec::new();
    for path in &args.manifests {
        extensions.extend(load_manifests(path)?);
    }

    let status_writer = KubeStatusWriter::new(client.clone());
    let status = args
        .write_status
        .then_some(&status_writer as &dyn aiext_operator::StatusWriter);
    let mode = if args.cleanup {
        PassMode::Cleanup
    } else {
        PassMode::Reconcile
    };

    let reports = run_pass(&reconciler, &extensions, mode, status).await;
    for report in &reports {
        if let Some(outcome) = &report.outcome {
            println!(
                "{}\t{}\t{}",
                report.name,
                outcome.phase().map(|p| p.to_string()).unwrap_or_default(),
                outcome.status.message
            );
        }
    }
    Ok(reports.iter().all(|report| report.ok))
}
