//! Wiring of the store, hooks, and migrations shared by every subcommand.

use std::sync::Arc;

use miette::Result;
use tbio_docs::{DocumentStore, MemoryStore, SqliteStore};
use tbio_profiles::{DocumentPipeline, HookRegistry, MigrationRegistry};
use tracing::info;

/// Database path that selects the in-memory store.
pub const MEMORY_DB: &str = ":memory:";

/// A fully wired site: one store shared by the pipeline and the migrations.
pub struct Site {
    pub store: Arc<dyn DocumentStore>,
    pub pipeline: Arc<DocumentPipeline>,
    pub migrations: MigrationRegistry,
}

impl Site {
    /// Open the store at `db` and install the profiles module on it.
    pub fn open(db: &str) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = if db == MEMORY_DB {
            info!("using in-memory store");
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(SqliteStore::open(db).map_err(|e| miette::miette!("{}", e))?)
        };
        Self::with_store(store)
    }

    pub fn with_store(store: Arc<dyn DocumentStore>) -> Result<Self> {
        let mut hooks = HookRegistry::new();
        let mut migrations = MigrationRegistry::new(Arc::clone(&store));
        tbio_profiles::install(Arc::clone(&store), &mut hooks, &mut migrations)
            .map_err(|e| miette::miette!("{}", e))?;

        Ok(Self {
            pipeline: Arc::new(DocumentPipeline::new(Arc::clone(&store), hooks)),
            store,
            migrations,
        })
    }
}
