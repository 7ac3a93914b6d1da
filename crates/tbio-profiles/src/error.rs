//! Error types for profile hooks and migrations.

use thiserror::Error;

/// Errors that can occur in profile hooks and migrations.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Document store error.
    #[error("store error: {0}")]
    Store(#[from] tbio_docs::StoreError),

    /// A migration failed partway; records it already processed stay migrated.
    #[error("migration {name} failed: {source}")]
    MigrationFailed {
        name: String,
        #[source]
        source: Box<ProfileError>,
    },

    /// No migration registered under this name.
    #[error("unknown migration: {0}")]
    UnknownMigration(String),

    /// A migration with this name is already registered.
    #[error("migration already registered: {0}")]
    DuplicateMigration(String),

    /// A migration depends on a name nobody registered.
    #[error("migration {name} depends on unregistered migration {dependency}")]
    MissingDependency { name: String, dependency: String },

    /// Migration dependencies form a cycle.
    #[error("migration dependency cycle involving {0}")]
    DependencyCycle(String),

    /// A migration was requested before one it depends on has run.
    #[error("migration {name} requires {dependency} to run first")]
    DependencyPending { name: String, dependency: String },
}
