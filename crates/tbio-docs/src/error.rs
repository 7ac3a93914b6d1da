//! Error types for the document store.

use thiserror::Error;

/// Errors that can occur when talking to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite query failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Document not found.
    #[error("document not found: {0}")]
    NotFound(String),

    /// A document with the same id already exists.
    #[error("duplicate document id: {0}")]
    Duplicate(String),

    /// Document failed validation before reaching storage.
    #[error("invalid document: {0}")]
    Invalid(String),

    /// The backend cannot serve requests.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
