//! The document store interface.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};

use crate::{Document, Filter, StoreError};

/// Lazy sequence of documents returned by [`DocumentStore::find`].
pub type DocStream<'a> = BoxStream<'a, Result<Document, StoreError>>;

/// Minimal document collection interface.
///
/// Each call is independently consistent at the single-document level; there
/// are no transactions. Errors are returned as-is and never retried here.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find documents matching the filter, in insertion order.
    async fn find(&self, filter: Filter) -> Result<DocStream<'_>, StoreError>;

    /// Insert a new document and return it as stored.
    ///
    /// A missing `_id` is generated. The document must carry a string `type`.
    async fn insert(&self, doc: Document) -> Result<Document, StoreError>;

    /// Replace the document with the given id.
    async fn replace(&self, id: &str, doc: Document) -> Result<Document, StoreError>;

    /// First document matching the filter.
    async fn find_one(&self, filter: Filter) -> Result<Option<Document>, StoreError> {
        let mut docs = self.find(filter).await?;
        docs.next().await.transpose()
    }

    /// All documents matching the filter.
    async fn find_all(&self, filter: Filter) -> Result<Vec<Document>, StoreError> {
        self.find(filter).await?.try_collect().await
    }
}

/// Validate a document for insertion, assigning an id if it has none.
pub(crate) fn prepare_insert(mut doc: Document) -> Result<Document, StoreError> {
    if doc.doc_type().is_none() {
        return Err(StoreError::Invalid("document has no type".to_string()));
    }
    match doc.get(crate::ID_FIELD) {
        None => doc.set_id(crate::generate_id()),
        Some(serde_json::Value::String(_)) => {}
        Some(other) => {
            return Err(StoreError::Invalid(format!(
                "document id must be a string, got {}",
                other
            )));
        }
    }
    Ok(doc)
}

/// Validate a replacement document against its target id.
pub(crate) fn prepare_replace(id: &str, mut doc: Document) -> Result<Document, StoreError> {
    match doc.id() {
        None => doc.set_id(id),
        Some(existing) if existing == id => {}
        Some(existing) => {
            return Err(StoreError::Invalid(format!(
                "replacement for {} carries id {}",
                id, existing
            )));
        }
    }
    if doc.doc_type().is_none() {
        return Err(StoreError::Invalid("document has no type".to_string()));
    }
    Ok(doc)
}
