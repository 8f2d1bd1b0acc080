//! Discovery of the service a Helm release exposes.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use kube::Client;
use kube::api::{Api, ListParams};

use crate::error::{Error, Result};

/// Label Helm charts put on everything a release creates.
pub const INSTANCE_LABEL: &str = "app.kubernetes.io/instance";

#[async_trait]
pub trait ServiceLookup: Send + Sync {
    /// Services in `namespace` labelled with `release` as their instance.
    async fn services_for_release(&self, namespace: &str, release: &str) -> Result<Vec<Service>>;
}

#[derive(Clone)]
pub struct KubeServices {
    client: Client,
}

impl KubeServices {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ServiceLookup for KubeServices {
    async fn services_for_release(&self, namespace: &str, release: &str) -> Result<Vec<Service>> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(&format!("{}={}", INSTANCE_LABEL, release));
        services
            .list(&params)
            .await
            .map(|list| list.items)
            .map_err(|e| Error::ServiceLookup {
                release: release.to_string(),
                message: e.to_string(),
            })
    }
}

/// The first service of `release`.
pub async fn service_for_release(
    lookup: &dyn ServiceLookup,
    namespace: &str,
    release: &str,
) -> Result<Service> {
    lookup
        .services_for_release(namespace, release)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::ServiceNotFound {
            release: release.to_string(),
            namespace: namespace.to_string(),
        })
}
