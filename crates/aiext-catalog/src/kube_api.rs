//! [`CatalogApi`] and [`SchemaRegistry`] backed by a live cluster.

use async_trait::async_trait;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::Client;
use kube::api::{Api, DeleteParams, DynamicObject, Patch, PatchParams, PostParams};
use serde_json::Value;

use crate::api::{CatalogApi, SchemaRegistry};
use crate::error::{Error, Result};
use crate::resource::{CatalogKind, resource_id};

#[derive(Clone)]
pub struct KubeCatalog {
    client: Client,
}

impl KubeCatalog {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, kind: CatalogKind, namespace: Option<&str>) -> Api<DynamicObject> {
        let resource = kind.api_resource();
        match namespace {
            Some(ns) if kind.namespaced() => Api::namespaced_with(self.client.clone(), ns, &resource),
            _ => Api::all_with(self.client.clone(), &resource),
        }
    }
}

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}

fn api_error(operation: &'static str, resource: String, err: kube::Error) -> Error {
    if is_not_found(&err) {
        return Error::NotFound { resource };
    }
    Error::Api {
        operation,
        resource,
        message: err.to_string(),
    }
}

fn to_value(resource: String, object: DynamicObject) -> Result<Value> {
    serde_json::to_value(object).map_err(|e| Error::Malformed {
        resource,
        message: e.to_string(),
    })
}

#[async_trait]
impl CatalogApi for KubeCatalog {
    async fn get(
        &self,
        kind: CatalogKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<Value>> {
        let id = resource_id(kind, namespace, name);
        match self.api(kind, namespace).get_opt(name).await {
            Ok(Some(object)) => to_value(id, object).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(api_error("get", id, e)),
        }
    }

    async fn create(
        &self,
        kind: CatalogKind,
        namespace: Option<&str>,
        object: &Value,
    ) -> Result<Value> {
        let name = object
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let id = resource_id(kind, namespace, name);
        let object: DynamicObject =
            serde_json::from_value(object.clone()).map_err(|e| Error::Malformed {
                resource: id.clone(),
                message: e.to_string(),
            })?;

        let created = self
            .api(kind, namespace)
            .create(&PostParams::default(), &object)
            .await
            .map_err(|e| api_error("create", id.clone(), e))?;
        to_value(id, created)
    }

    async fn patch_merge(
        &self,
        kind: CatalogKind,
        namespace: Option<&str>,
        name: &str,
        patch: &Value,
    ) -> Result<Value> {
        let id = resource_id(kind, namespace, name);
        let patched = self
            .api(kind, namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(|e| api_error("patch", id.clone(), e))?;
        to_value(id, patched)
    }

    async fn delete(&self, kind: CatalogKind, namespace: Option<&str>, name: &str) -> Result<()> {
        self.api(kind, namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| api_error("delete", resource_id(kind, namespace, name), e))
    }
}

#[async_trait]
impl SchemaRegistry for KubeCatalog {
    async fn crd_exists(&self, name: &str) -> Result<bool> {
        let crds: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        crds.get_opt(name)
            .await
            .map(|crd| crd.is_some())
            .map_err(|e| Error::Api {
                operation: "get",
                resource: format!("CustomResourceDefinition/{}", name),
                message: e.to_string(),
            })
    }
}
