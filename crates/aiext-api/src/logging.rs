//! Component names recorded in the `component` field of every span.
//!
//! Field names themselves are fixed across the workspace: `extension`,
//! `namespace`, `name`, `version`, `resource`, `component`.

pub const HELM: &str = "helm";
pub const HELM_INDEX: &str = "helm.index";
pub const RANCHER: &str = "rancher";
pub const CLUSTER_REPO: &str = "rancher.clusterrepo";
pub const UI_PLUGIN: &str = "rancher.uiplugin";
pub const METADATA: &str = "rancher.metadata";
pub const PREFLIGHT: &str = "rancher.preflight";
pub const CLEANUP: &str = "rancher.cleanup";
pub const RECONCILER: &str = "reconciler";
