//! Process-wide cache of repository index documents.
//!
//! Entries are keyed by repository URL and never expire: once an index has
//! been fetched for a URL, later lookups return that same document. A chart
//! republished under an existing version is therefore not observed until the
//! process restarts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use aiext_api::logging;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::index::{IndexDocument, IndexFetcher, index_url};

#[derive(Debug, Clone)]
pub struct IndexCacheEntry {
    pub index: Arc<IndexDocument>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct IndexCache {
    items: Mutex<HashMap<String, IndexCacheEntry>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> MutexGuard<'_, HashMap<String, IndexCacheEntry>> {
        // The map stays consistent even if a holder panicked.
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, repository_url: &str) -> Option<IndexCacheEntry> {
        self.items().get(repository_url).cloned()
    }

    /// Store `entry` unless one already exists, returning the stored entry.
    pub fn insert(&self, repository_url: &str, entry: IndexCacheEntry) -> IndexCacheEntry {
        self.items()
            .entry(repository_url.to_string())
            .or_insert(entry)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Return the cached index for `repository_url`, fetching
    /// `<repository_url>/index.yaml` on a miss.
    ///
    /// The lock is not held during the fetch. If two callers miss at once,
    /// both fetch and the first document stored is returned to both.
    #[tracing::instrument(skip(self, fetcher), fields(component = logging::HELM_INDEX))]
    pub async fn get_or_fetch(
        &self,
        repository_url: &str,
        fetcher: &dyn IndexFetcher,
    ) -> Result<Arc<IndexDocument>> {
        if let Some(entry) = self.get(repository_url) {
            tracing::trace!(
                repository = %repository_url,
                fetched_at = %entry.fetched_at,
                "Index cache hit"
            );
            return Ok(entry.index);
        }

        let index = fetcher.fetch_index(&index_url(repository_url)).await?;
        let stored = self.insert(
            repository_url,
            IndexCacheEntry {
                index: Arc::new(index),
                fetched_at: Utc::now(),
            },
        );

        tracing::debug!(
            repository = %repository_url,
            charts = stored.index.entries.len(),
            "Cached Helm repository index"
        );
        Ok(stored.index)
    }
}
