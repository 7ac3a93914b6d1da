//! In-memory document store.

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use tokio::sync::RwLock;
use tracing::trace;

use crate::store::{prepare_insert, prepare_replace};
use crate::{DocStream, Document, DocumentStore, Filter, StoreError};

/// Insertion-ordered document store held entirely in memory.
///
/// `find` snapshots the matching documents when called, so writes made while
/// a stream is being consumed are not observed by that stream.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with documents, bypassing validation.
    pub fn with_documents(docs: impl IntoIterator<Item = Document>) -> Self {
        Self {
            docs: RwLock::new(docs.into_iter().collect()),
        }
    }

    /// Copy of every stored document.
    pub async fn snapshot(&self) -> Vec<Document> {
        self.docs.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, filter: Filter) -> Result<DocStream<'_>, StoreError> {
        let matches: Vec<Document> = self
            .docs
            .read()
            .await
            .iter()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect();
        trace!(count = matches.len(), "memory find");
        Ok(stream::iter(matches.into_iter().map(Ok)).boxed())
    }

    async fn insert(&self, doc: Document) -> Result<Document, StoreError> {
        let doc = prepare_insert(doc)?;
        let mut docs = self.docs.write().await;
        if docs.iter().any(|d| d.id() == doc.id()) {
            return Err(StoreError::Duplicate(
                doc.id().unwrap_or_default().to_string(),
            ));
        }
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn replace(&self, id: &str, doc: Document) -> Result<Document, StoreError> {
        let doc = prepare_replace(id, doc)?;
        let mut docs = self.docs.write().await;
        let slot = docs
            .iter_mut()
            .find(|d| d.id() == Some(id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        *slot = doc.clone();
        Ok(doc)
    }
}
