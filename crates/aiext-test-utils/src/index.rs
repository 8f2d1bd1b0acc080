//! Canned repository index documents.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use aiext_helm::index::index_url;
use aiext_helm::{ChartVersion, Error, IndexDocument, IndexFetcher, Result};
use async_trait::async_trait;

/// Serves index documents registered per repository URL and counts requests.
/// Unknown URLs fail like an unreachable server.
#[derive(Default)]
pub struct FakeIndexFetcher {
    documents: Mutex<HashMap<String, IndexDocument>>,
    requests: AtomicUsize,
}

impl FakeIndexFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `chart` at `version` with `annotations` in the index of
    /// `repository_url`.
    pub fn with_chart(self, repository_url: &str, chart: &str, version: &str, annotations: &[(&str, &str)]) -> Self {
        self.publish(repository_url, chart, version, annotations);
        self
    }

    pub fn publish(&self, repository_url: &str, chart: &str, version: &str, annotations: &[(&str, &str)]) {
        let annotations: BTreeMap<String, String> = annotations
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.documents
            .lock()
            .unwrap()
            .entry(index_url(repository_url))
            .or_default()
            .entries
            .entry(chart.to_string())
            .or_default()
            .push(ChartVersion {
                version: version.to_string(),
                annotations,
            });
    }

    /// Number of `fetch_index` calls so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexFetcher for FakeIndexFetcher {
    async fn fetch_index(&self, url: &str) -> Result<IndexDocument> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.documents
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::IndexFetch {
                url: url.to_string(),
                message: "404 Not Found".to_string(),
            })
    }
}
