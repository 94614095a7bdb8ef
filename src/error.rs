use thiserror::Error;

use crate::storage::StorageError;

/// Result type for library operations.
pub type LibraryResult<T> = Result<T, LibraryError>;

/// Typed failures of catalog, circulation and snapshot operations.
///
/// None of these are fatal. The dispatch layer turns each of them into an
/// [`AppResponse`](crate::app_response::AppResponse) error record.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The uniqueness field (accession number, member code) is already taken.
    #[error("{0}")]
    DuplicateKey(String),

    /// The targeted id does not exist (or, for returns, is not outstanding).
    #[error("{0}")]
    NotFound(String),

    /// The book has no copies left to issue.
    #[error("{0}")]
    Unavailable(String),

    /// An outstanding circulation record still references the entity.
    #[error("{0}")]
    HasActiveReferences(String),

    /// An imported snapshot is missing required fields or is malformed.
    #[error("{0}")]
    InvalidFormat(String),

    /// Field values violate a record invariant.
    #[error("{0}")]
    Validation(String),

    /// The request itself is malformed (unknown action, bad id, bad date).
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
