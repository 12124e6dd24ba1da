//! LinkStore errors

use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by [`LinkStore`](crate::store::LinkStore) operations
#[derive(Error, Debug)]
pub enum Error {
    /// A required field is empty or a URL is malformed; nothing was changed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No link has the given ID; nothing was changed
    #[error("Link not found: {0}")]
    NotFound(String),

    /// An import payload has the wrong shape; nothing was imported
    #[error("Invalid import data: {0}")]
    Validation(String),

    /// The backing store failed to read or write
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for LinkStore operations
pub type Result<T> = std::result::Result<T, Error>;
