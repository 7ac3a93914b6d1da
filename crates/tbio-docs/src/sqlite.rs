//! SQLite-backed document store.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use rusqlite::{Connection, ErrorCode, params};
use tracing::{debug, info};

use crate::store::{prepare_insert, prepare_replace};
use crate::{DocStream, Document, DocumentStore, Filter, StoreError};

/// Rows fetched per round trip while streaming `find` results.
const PAGE_SIZE: usize = 100;

/// Document store persisted in a single SQLite table.
///
/// Documents are kept as JSON text alongside their id and type. The `seq`
/// column preserves insertion order and drives cursor paging.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Cursor state for a paged `find`.
struct Page {
    filter: Filter,
    after_seq: i64,
    buffered: VecDeque<Document>,
    exhausted: bool,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        let store = Self::init(conn)?;
        info!(path = %path.display(), "opened document store");
        Ok(store)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS docs (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                type TEXT NOT NULL,
                body TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_docs_type ON docs(type, seq);
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }

    /// Fetch the next page of documents after `after_seq`, optionally narrowed
    /// to one type. Returns the documents and the last seq seen.
    fn fetch_page(
        &self,
        doc_type: Option<&str>,
        after_seq: i64,
    ) -> Result<(Vec<Document>, Option<i64>), StoreError> {
        let rows: Vec<(i64, String)> = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare_cached(
                "SELECT seq, body FROM docs
                 WHERE (?1 IS NULL OR type = ?1) AND seq > ?2
                 ORDER BY seq
                 LIMIT ?3",
            )?;
            let rows: Vec<(i64, String)> = stmt
                .query_map(params![doc_type, after_seq, PAGE_SIZE as i64], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let last_seq = rows.last().map(|(seq, _)| *seq);
        let docs = rows
            .into_iter()
            .map(|(_, body)| serde_json::from_str::<Document>(&body))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((docs, last_seq))
    }

    /// Advance a paged cursor to its next matching document.
    async fn next_match(&self, mut page: Page) -> Result<Option<(Document, Page)>, StoreError> {
        loop {
            if let Some(doc) = page.buffered.pop_front() {
                return Ok(Some((doc, page)));
            }
            if page.exhausted {
                return Ok(None);
            }

            let (docs, last_seq) = self.fetch_page(page.filter.type_constraint(), page.after_seq)?;
            debug!(fetched = docs.len(), after_seq = page.after_seq, "sqlite page");

            page.exhausted = docs.len() < PAGE_SIZE;
            if let Some(seq) = last_seq {
                page.after_seq = seq;
            }
            page.buffered.extend(docs.into_iter().filter(|doc| page.filter.matches(doc)));
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn find(&self, filter: Filter) -> Result<DocStream<'_>, StoreError> {
        let page = Page {
            filter,
            after_seq: 0,
            buffered: VecDeque::new(),
            exhausted: false,
        };

        let docs = stream::try_unfold(page, move |page| self.next_match(page));
        Ok(docs.boxed())
    }

    async fn insert(&self, doc: Document) -> Result<Document, StoreError> {
        let doc = prepare_insert(doc)?;
        let id = doc.id().unwrap_or_default().to_string();
        let doc_type = doc.doc_type().unwrap_or_default().to_string();
        let body = serde_json::to_string(&doc)?;

        let conn = self.lock()?;
        match conn.execute(
            "INSERT INTO docs (id, type, body) VALUES (?1, ?2, ?3)",
            params![id, doc_type, body],
        ) {
            Ok(_) => Ok(doc),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Duplicate(id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(&self, id: &str, doc: Document) -> Result<Document, StoreError> {
        let doc = prepare_replace(id, doc)?;
        let doc_type = doc.doc_type().unwrap_or_default().to_string();
        let body = serde_json::to_string(&doc)?;

        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE docs SET type = ?2, body = ?3 WHERE id = ?1",
            params![id, doc_type, body],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(doc)
    }
}
