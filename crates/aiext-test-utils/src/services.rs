//! Release service discovery without a cluster.

use std::collections::BTreeMap;
use std::sync::Mutex;

use aiext_operator::{INSTANCE_LABEL, Result, ServiceLookup};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// A service `name` in `namespace` labelled as part of `release`.
pub fn service(name: &str, namespace: &str, release: &str, ports: &[i32]) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(INSTANCE_LABEL.to_string(), release.to_string())])),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            ports: Some(
                ports
                    .iter()
                    .map(|port| ServicePort {
                        port: *port,
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Services matched by namespace and instance label, like a label-selector list.
#[derive(Default)]
pub struct FakeServices {
    services: Mutex<Vec<Service>>,
}

impl FakeServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(self, service: Service) -> Self {
        self.add(service);
        self
    }

    pub fn add(&self, service: Service) {
        self.services.lock().unwrap().push(service);
    }
}

#[async_trait]
impl ServiceLookup for FakeServices {
    async fn services_for_release(&self, namespace: &str, release: &str) -> Result<Vec<Service>> {
        Ok(self
            .services
            .lock()
            .unwrap()
            .iter()
            .filter(|svc| svc.metadata.namespace.as_deref() == Some(namespace))
            .filter(|svc| {
                svc.metadata
                    .labels
                    .as_ref()
                    .and_then(|labels| labels.get(INSTANCE_LABEL))
                    .is_some_and(|value| value == release)
            })
            .cloned()
            .collect())
    }
}
