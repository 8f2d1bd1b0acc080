//! Helm repository index documents.
//!
//! Only the parts of `index.yaml` the operator reads are modelled:
//!
//! ```yaml
//! entries:
//!   my-extension:
//!     - version: 1.2.0
//!       annotations:
//!         catalog.cattle.io/display-name: My Extension
//! ```
//!
//! Every other field (`urls`, `digest`, `created`, ...) is ignored.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    #[serde(default)]
    pub entries: HashMap<String, Vec<ChartVersion>>,
}

/// One published version of a chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartVersion {
    pub version: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl IndexDocument {
    /// Annotations of `chart` at exactly `version`.
    ///
    /// Versions are compared byte for byte, not as semver.
    pub fn find_annotations(&self, chart: &str, version: &str) -> Result<&BTreeMap<String, String>> {
        let versions = self
            .entries
            .get(chart)
            .ok_or_else(|| Error::ChartNotInIndex {
                chart: chart.to_string(),
            })?;

        versions
            .iter()
            .find(|v| v.version == version)
            .map(|v| &v.annotations)
            .ok_or_else(|| Error::VersionNotInIndex {
                chart: chart.to_string(),
                version: version.to_string(),
            })
    }
}

/// Location of the index document for a repository URL.
pub fn index_url(repository_url: &str) -> String {
    format!("{}/index.yaml", repository_url.trim_end_matches('/'))
}

/// Parse an index document fetched from `url`.
pub fn parse_index(url: &str, body: &[u8]) -> Result<IndexDocument> {
    serde_yaml::from_slice(body).map_err(|source| Error::IndexParse {
        url: url.to_string(),
        source,
    })
}

/// Retrieves index documents. One call is one request; retries belong to the caller.
#[async_trait]
pub trait IndexFetcher: Send + Sync {
    async fn fetch_index(&self, url: &str) -> Result<IndexDocument>;
}

/// [`IndexFetcher`] over plain HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpIndexFetcher {
    client: reqwest::Client,
}

impl HttpIndexFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IndexFetcher for HttpIndexFetcher {
    async fn fetch_index(&self, url: &str) -> Result<IndexDocument> {
        tracing::debug!(%url, "Fetching Helm repository index");

        let fetch_err = |message: String| Error::IndexFetch {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("unexpected status {}", status)));
        }

        let body = response.bytes().await.map_err(|e| fetch_err(e.to_string()))?;
        parse_index(url, &body)
    }
}
