//! Backing store interface
//!
//! A backing store holds JSON values under top-level keys. Reads and writes
//! replace whole values; there is no field-level update. Every successful
//! write is announced to the listeners registered for that key. Stores
//! sharing one backend see each other's writes; a watched [`FileBackend`]
//! also announces writes made by other instances and processes.
//!
//! [`FileBackend`]: crate::storage::FileBackend

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::events::{EventBus, Handler, HandlerId};
use crate::storage::error::StorageResult;

/// Top-level key holding the whole link store
pub const JUMPMARKS_KEY: &str = "jumpmarks";

/// Default size quota for the whole backing store
pub const DEFAULT_QUOTA_BYTES: usize = 102_400;

/// Notification that a top-level key was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    /// The key that changed
    pub key: String,
    /// Serialized size of the whole backing store after the write
    pub byte_len: usize,
}

/// Change listeners keyed by top-level key
pub type ChangeBus = EventBus<String, StorageChange>;

/// Asynchronous key-value store that persists link data
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Read the value stored under `key`
    async fn read(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Replace the value stored under `key`
    ///
    /// Fails with `QuotaExceeded` when the backing store would grow past its
    /// quota; nothing is written in that case.
    async fn write(&self, key: &str, value: Value) -> StorageResult<()>;

    /// Register a listener for writes to `key`
    fn on_change(&self, key: &str, listener: Handler<StorageChange>) -> HandlerId;

    /// Remove a listener registered with [`on_change`](Self::on_change)
    fn remove_listener(&self, key: &str, id: HandlerId) -> bool;
}

#[async_trait]
impl<B: KeyValueBackend + ?Sized> KeyValueBackend for Arc<B> {
    async fn read(&self, key: &str) -> StorageResult<Option<Value>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &str, value: Value) -> StorageResult<()> {
        (**self).write(key, value).await
    }

    fn on_change(&self, key: &str, listener: Handler<StorageChange>) -> HandlerId {
        (**self).on_change(key, listener)
    }

    fn remove_listener(&self, key: &str, id: HandlerId) -> bool {
        (**self).remove_listener(key, id)
    }
}

/// Register a shared handler on a change bus
pub(crate) fn subscribe(bus: &ChangeBus, key: &str, listener: Handler<StorageChange>) -> HandlerId {
    bus.on(key.to_string(), move |change| listener(change))
}

/// Reject a write that would take the store past `quota`
pub(crate) fn check_quota(needed: usize, quota: Option<usize>) -> StorageResult<()> {
    match quota {
        Some(quota) if needed > quota => {
            Err(crate::storage::StorageError::QuotaExceeded { needed, quota })
        }
        _ => Ok(()),
    }
}
