//! Cross-node stat aggregation: an opaque key-value capability plus the
//! periodic publisher that feeds it.

mod etcd;
mod publisher;


pub use etcd::EtcdStore;
pub use publisher::{PUBLISH_PERIOD, publish_once, spawn_stats_publisher};

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StoreError;

/// Key-value capability consumed by the publisher. Cluster bootstrap and
/// membership are entirely the store's concern.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Writes one key. Each write is independent; callers treat failures as
    /// recoverable.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` when the store is unreachable or rejects the
    /// write.
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-process store used in tests and as a reference implementation of the
/// capability.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}
