//! Storage layer
//!
//! LinkStore persists through a [`KeyValueBackend`]: a store of JSON values
//! under top-level keys that announces every write to registered listeners.
//!
//! ## Backends
//!
//! - [`MemoryBackend`]: in-process, for tests and embedding
//! - [`FileBackend`]: one JSON file in the data directory, atomic writes
//!
//! Both enforce an optional size quota. LinkStore never checks the quota
//! itself; an oversized write fails here with `QuotaExceeded`.

pub mod backend;
pub mod error;
pub mod file;
pub mod memory;

pub use backend::{
    ChangeBus, KeyValueBackend, StorageChange, DEFAULT_QUOTA_BYTES, JUMPMARKS_KEY,
};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::MemoryBackend;
