//! Catalog annotations for a UI extension version.
//!
//! The repository index is the source of truth for the keys Rancher reads
//! when listing an extension. Users can override any of them from the
//! extension spec.

use std::collections::BTreeMap;

use aiext_api::logging;
use aiext_helm::{IndexCache, IndexFetcher};
use tracing::{debug, trace, warn};

use crate::error::Result;

pub const KEY_DISPLAY_NAME: &str = "catalog.cattle.io/display-name";
pub const KEY_RANCHER_VERSION: &str = "catalog.cattle.io/rancher-version";
pub const KEY_UI_EXTENSIONS_VERSION: &str = "catalog.cattle.io/ui-extensions-version";

/// Annotation keys copied from the index.
pub const SUPPORTED_KEYS: [&str; 3] = [KEY_DISPLAY_NAME, KEY_RANCHER_VERSION, KEY_UI_EXTENSIONS_VERSION];

pub type ResolvedMetadata = BTreeMap<String, String>;

/// Resolve the plugin metadata of `extension_name` at `version`.
///
/// The index is looked up through `cache`; chart and version must match
/// exactly. The returned map is owned by the caller.
#[tracing::instrument(
    skip(cache, fetcher, user_metadata),
    fields(component = logging::METADATA, extension = %extension_name, version = %version)
)]
pub async fn resolve_metadata(
    cache: &IndexCache,
    fetcher: &dyn IndexFetcher,
    repository_url: &str,
    extension_name: &str,
    version: &str,
    user_metadata: &BTreeMap<String, String>,
) -> Result<ResolvedMetadata> {
    debug!("Resolving extension metadata from Helm index");

    let index = cache
        .get_or_fetch(repository_url, fetcher)
        .await
        .inspect_err(|e| warn!(error = %e, "Failed to load Helm index"))?;

    let annotations = index
        .find_annotations(extension_name, version)
        .inspect_err(|e| warn!(error = %e, "Failed to find chart annotations in index"))?;

    let from_index = filter_supported(annotations);
    trace!(metadata = ?from_index, "Metadata extracted from index");

    let resolved = merge_metadata(from_index, user_metadata, extension_name);
    debug!(
        display_name = resolved.get(KEY_DISPLAY_NAME).map(String::as_str),
        ui_extensions_version = resolved.get(KEY_UI_EXTENSIONS_VERSION).map(String::as_str),
        "Plugin metadata resolved"
    );
    Ok(resolved)
}

/// Keep only the [`SUPPORTED_KEYS`].
pub fn filter_supported(annotations: &BTreeMap<String, String>) -> ResolvedMetadata {
    SUPPORTED_KEYS
        .iter()
        .filter_map(|key| annotations.get(*key).map(|value| (key.to_string(), value.clone())))
        .collect()
}

/// Overlay `user` on `from_index` and default the display name.
pub fn merge_metadata(
    mut from_index: ResolvedMetadata,
    user: &BTreeMap<String, String>,
    extension_name: &str,
) -> ResolvedMetadata {
    from_index.extend(user.iter().map(|(k, v)| (k.clone(), v.clone())));
    from_index
        .entry(KEY_DISPLAY_NAME.to_string())
        .or_insert_with(|| extension_name.to_string());
    from_index
}
