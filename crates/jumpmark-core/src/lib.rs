//! Jumpmark Core Library
//!
//! This crate provides the core functionality for Jumpmark, a store of jump
//! links attached to web pages. A link created on one page can be paired
//! with a link back from its destination, forming a bidirectional pair.
//!
//! # Architecture
//!
//! - **Normalized identity**: pages are keyed by host (without `www.`) plus
//!   path, so `https://www.example.com/docs/` and `http://example.com/docs`
//!   share their links
//! - **Derived pairing**: whether a link has a partner is computed from the
//!   current links every time, never stored
//! - **Backing store**: the whole store is one JSON value under the
//!   `jumpmarks` key of a [`KeyValueBackend`]
//!
//! # Quick Start
//!
//! ```text
//! let store = LinkStore::new(FileBackend::from_config(&Config::load()?));
//!
//! // Add a link with a reciprocal link back
//! let link = store
//!     .create(NewLink::new("Docs", "https://docs.rs", "https://example.com").with_reciprocal(None))
//!     .await?;
//!
//! // Query links
//! let on_page = store.get_for_page("https://example.com").await?;
//! let partner = store.find_partner(&link).await;
//! ```
//!
//! # Modules
//!
//! - `store`: LinkStore operations (main entry point)
//! - `models`: Link record and operation inputs
//! - `normalize`: Page identity from URLs
//! - `pairing`: Bidirectional pair detection
//! - `index`: Ordered in-memory form of the store
//! - `query`: Search, filter, sort and pagination
//! - `export`: JSON, CSV and HTML export, JSON import
//! - `storage`: Backing store trait and backends
//! - `events`: Change notification
//! - `config`: Application configuration

pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod id;
pub mod index;
pub mod models;
pub mod normalize;
pub mod pairing;
pub mod query;
pub mod storage;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use events::{EventBus, HandlerId};
pub use export::{ExportDocument, ExportFormat, ImportPayload};
pub use index::LinkIndex;
pub use models::{ImportOptions, ImportSummary, Link, LinkPatch, NewLink, StoreStats};
pub use normalize::{is_internal_page, normalize_url, validate_url};
pub use pairing::{find_partner_in, is_pair, LinkKind};
pub use query::{paginate, KindFilter, LinkQuery, Page, SortKey};
pub use storage::{
    FileBackend, KeyValueBackend, MemoryBackend, StorageChange, StorageError, StorageResult,
};
pub use store::LinkStore;
