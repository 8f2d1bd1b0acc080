//! Reading `InstallAIExtension` objects from YAML files.

use std::path::Path;

use aiext_api::InstallAIExtension;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Every `InstallAIExtension` in the (possibly multi-document) YAML file at
/// `path`. Empty documents are skipped.
pub fn load_manifests(path: &Path) -> Result<Vec<InstallAIExtension>> {
    let manifest_err = |message: String| Error::Manifest {
        path: path.to_path_buf(),
        message,
    };

    let content = std::fs::read_to_string(path).map_err(|e| manifest_err(e.to_string()))?;

    let mut extensions = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&content) {
        let value = serde_yaml::Value::deserialize(document).map_err(|e| manifest_err(e.to_string()))?;
        if value.is_null() {
            continue;
        }
        let extension: InstallAIExtension =
            serde_yaml::from_value(value).map_err(|e| manifest_err(e.to_string()))?;
        extensions.push(extension);
    }
    Ok(extensions)
}
