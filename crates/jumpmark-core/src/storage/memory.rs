//! In-process backing store

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::events::{Handler, HandlerId};
use crate::storage::backend::{
    check_quota, subscribe, ChangeBus, KeyValueBackend, StorageChange,
};
use crate::storage::error::StorageResult;

/// Backing store kept in memory
///
/// Used by tests and by callers that persist elsewhere. Values are cloned on
/// read, so callers never observe another writer's in-progress state.
#[derive(Default)]
pub struct MemoryBackend {
    values: RwLock<Map<String, Value>>,
    quota: Option<usize>,
    changes: ChangeBus,
}

impl MemoryBackend {
    /// Create an empty store without a quota
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that rejects writes past `quota` bytes
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Serialized size of everything stored
    pub async fn byte_len(&self) -> usize {
        let values = self.values.read().await;
        serde_json::to_vec(&*values).map(|b| b.len()).unwrap_or(0)
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn read(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: Value) -> StorageResult<()> {
        let byte_len = {
            let mut values = self.values.write().await;
            let mut next = values.clone();
            next.insert(key.to_string(), value);

            let byte_len = serde_json::to_vec(&next)?.len();
            check_quota(byte_len, self.quota)?;
            *values = next;
            byte_len
        };

        debug!("Wrote key {} ({} bytes total)", key, byte_len);
        self.changes.emit(
            &key.to_string(),
            &StorageChange {
                key: key.to_string(),
                byte_len,
            },
        );
        Ok(())
    }

    fn on_change(&self, key: &str, listener: Handler<StorageChange>) -> HandlerId {
        subscribe(&self.changes, key, listener)
    }

    fn remove_listener(&self, key: &str, id: HandlerId) -> bool {
        self.changes.off(&key.to_string(), id)
    }
}
