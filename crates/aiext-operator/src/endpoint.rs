//! Where an extension's catalog is served from.

use k8s_openapi::api::core::v1::Service;
use kube::ResourceExt;
use url::Url;

use crate::error::{Error, Result};

const RAW_CONTENT_HOST: &str = "https://raw.githubusercontent.com";

/// Raw content base of `branch` in the GitHub-style repository `repo_url`.
///
/// `https://github.com/acme/extensions.git` on `main` becomes
/// `https://raw.githubusercontent.com/acme/extensions/main`.
pub fn raw_repository_url(repo_url: &str, branch: &str) -> Result<String> {
    let invalid = |reason: &str| Error::RepositoryUrl {
        url: repo_url.to_string(),
        reason: reason.to_string(),
    };

    if branch.is_empty() {
        return Err(invalid("branch must be set"));
    }
    let url = Url::parse(repo_url).map_err(|e| invalid(&e.to_string()))?;

    let path = url.path().trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let (Some(org), Some(repo)) = (segments.next(), segments.next()) else {
        return Err(invalid("expected <org>/<repo> in the path"));
    };

    Ok(format!("{}/{}/{}/{}", RAW_CONTENT_HOST, org, repo, branch))
}

/// Cluster-local URL of `service` on its first port.
pub fn service_url(service: &Service) -> Result<String> {
    let name = service.name_any();
    let port = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .and_then(|ports| ports.first())
        .map(|port| port.port)
        .ok_or_else(|| Error::ServiceWithoutPorts {
            service: name.clone(),
        })?;
    let namespace = service.namespace().unwrap_or_default();

    Ok(format!("http://{}.{}.svc.cluster.local:{}", name, namespace, port))
}
