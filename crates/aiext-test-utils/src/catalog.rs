//! In-memory catalog API and CRD registry.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use aiext_catalog::merge::merge_patch;
use aiext_catalog::resource::resource_id;
use aiext_catalog::{CatalogApi, CatalogKind, Error, Result, SchemaRegistry};
use async_trait::async_trait;
use serde_json::Value;

type Key = (CatalogKind, Option<String>, String);

/// One write or delete made against [`FakeCatalog`]. Reads are not recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogCall {
    Create { kind: CatalogKind, name: String },
    Patch { kind: CatalogKind, name: String, patch: Value },
    Delete { kind: CatalogKind, name: String },
}

/// Catalog objects kept in a map, with merge patches applied the way the
/// API server applies them.
#[derive(Default)]
pub struct FakeCatalog {
    objects: Mutex<BTreeMap<String, (Key, Value)>>,
    calls: Mutex<Vec<CatalogCall>>,
    failing: Mutex<HashSet<&'static str>>,
}

fn key(kind: CatalogKind, namespace: Option<&str>, name: &str) -> Key {
    let namespace = namespace.filter(|_| kind.namespaced()).map(str::to_string);
    (kind, namespace, name.to_string())
}

fn id(key: &Key) -> String {
    resource_id(key.0, key.1.as_deref(), &key.2)
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `operation` (`"get"`, `"create"`, `"patch"`,
    /// `"delete"`) fail with an API error.
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    fn check(&self, operation: &'static str, key: &Key) -> Result<()> {
        if self.failing.lock().unwrap().contains(operation) {
            return Err(Error::Api {
                operation,
                resource: id(key),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    /// Store `object` directly, bypassing the call log.
    pub fn insert(&self, kind: CatalogKind, namespace: Option<&str>, object: Value) {
        let name = object
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let key = key(kind, namespace, &name);
        self.objects.lock().unwrap().insert(id(&key), (key, object));
    }

    pub fn object(&self, kind: CatalogKind, namespace: Option<&str>, name: &str) -> Option<Value> {
        let key = key(kind, namespace, name);
        self.objects
            .lock()
            .unwrap()
            .get(&id(&key))
            .map(|(_, object)| object.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn calls(&self) -> Vec<CatalogCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn get(
        &self,
        kind: CatalogKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<Value>> {
        self.check("get", &key(kind, namespace, name))?;
        Ok(self.object(kind, namespace, name))
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
            .unwrap_or_default()
            .to_string();
        let key = key(kind, namespace, &name);
        self.check("create", &key)?;

        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&id(&key)) {
            return Err(Error::Api {
                operation: "create",
                resource: id(&key),
                message: "already exists".to_string(),
            });
        }
        objects.insert(id(&key), (key, object.clone()));
        self.calls.lock().unwrap().push(CatalogCall::Create { kind, name });
        Ok(object.clone())
    }

    async fn patch_merge(
        &self,
        kind: CatalogKind,
        namespace: Option<&str>,
        name: &str,
        patch: &Value,
    ) -> Result<Value> {
        let key = key(kind, namespace, name);
        self.check("patch", &key)?;

        let mut objects = self.objects.lock().unwrap();
        let Some((_, object)) = objects.get_mut(&id(&key)) else {
            return Err(Error::NotFound { resource: id(&key) });
        };
        merge_patch(object, patch);
        self.calls.lock().unwrap().push(CatalogCall::Patch {
            kind,
            name: name.to_string(),
            patch: patch.clone(),
        });
        Ok(object.clone())
    }

    async fn delete(&self, kind: CatalogKind, namespace: Option<&str>, name: &str) -> Result<()> {
        let key = key(kind, namespace, name);
        self.check("delete", &key)?;

        self.calls.lock().unwrap().push(CatalogCall::Delete {
            kind,
            name: name.to_string(),
        });
        match self.objects.lock().unwrap().remove(&id(&key)) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound { resource: id(&key) }),
        }
    }
}

/// A fixed set of installed CRDs.
#[derive(Default)]
pub struct FakeSchemaRegistry {
    installed: Mutex<HashSet<String>>,
    failing: Mutex<bool>,
}

impl FakeSchemaRegistry {
    /// No CRDs installed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Both Rancher catalog CRDs installed.
    pub fn with_catalog_crds() -> Self {
        let registry = Self::default();
        registry.install(&CatalogKind::UIPlugin.crd_name());
        registry.install(&CatalogKind::ClusterRepo.crd_name());
        registry
    }

    pub fn install(&self, name: &str) {
        self.installed.lock().unwrap().insert(name.to_string());
    }

    /// Make every later query fail with an API error.
    pub fn fail(&self) {
        *self.failing.lock().unwrap() = true;
    }
}

#[async_trait]
impl SchemaRegistry for FakeSchemaRegistry {
    async fn crd_exists(&self, name: &str) -> Result<bool> {
        if *self.failing.lock().unwrap() {
            return Err(Error::Api {
                operation: "get",
                resource: format!("CustomResourceDefinition/{}", name),
                message: "injected failure".to_string(),
            });
        }
        Ok(self.installed.lock().unwrap().contains(name))
    }
}
