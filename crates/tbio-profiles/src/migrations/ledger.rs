//! Persistent record of migrations that have run.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use tbio_docs::{Document, DocumentStore, Filter, MIGRATION_TYPE};

use crate::ProfileError;

/// One completed migration, stored as a document keyed by migration name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    #[serde(rename = "_id")]
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub ran_at: DateTime<Utc>,
    #[serde(default)]
    pub records_updated: usize,
}

/// Ledger of completed migrations, kept in the document store itself.
pub struct MigrationLedger {
    store: Arc<dyn DocumentStore>,
}

impl MigrationLedger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Every completed migration, by name.
    pub async fn completed(&self) -> Result<HashMap<String, LedgerEntry>, ProfileError> {
        let mut entries = HashMap::new();
        let mut docs = self.store.find(Filter::of_type(MIGRATION_TYPE)).await?;
        while let Some(doc) = docs.try_next().await? {
            let entry: LedgerEntry = doc.decode()?;
            entries.insert(entry.name.clone(), entry);
        }
        Ok(entries)
    }

    /// Mark a migration as completed.
    pub async fn record(
        &self,
        name: &str,
        records_updated: usize,
    ) -> Result<LedgerEntry, ProfileError> {
        let entry = LedgerEntry {
            name: name.to_string(),
            doc_type: MIGRATION_TYPE.to_string(),
            ran_at: Utc::now(),
            records_updated,
        };
        self.store.insert(Document::encode(&entry)?).await?;
        Ok(entry)
    }
}
