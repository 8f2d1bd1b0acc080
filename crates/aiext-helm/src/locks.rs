//! Per-release mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lazily created async lock per release name.
///
/// The table mutex only guards lookup and insertion. Locks are retained for
/// the life of the process.
#[derive(Debug, Default)]
pub struct ReleaseLocks {
    table: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ReleaseLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `name`. Access ends when the guard drops.
    pub async fn acquire(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(table.entry(name.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of release names seen so far.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
