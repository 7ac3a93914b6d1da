//! Error types for the web layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebError {
    /// Request body was not a valid submission.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("comment is empty")]
    EmptyComment,

    /// The insert pipeline rejected the document.
    #[error("insert failed: {0}")]
    Insert(#[from] tbio_profiles::ProfileError),

    #[error("store error: {0}")]
    Store(#[from] tbio_docs::StoreError),

    /// Binding or serving the listener failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
