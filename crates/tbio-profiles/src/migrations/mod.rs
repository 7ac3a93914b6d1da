//! Migration framework for one-time data corrections.
//!
//! Migrations are named units of work registered against a
//! [`MigrationRegistry`], which records the ones that have run and runs the
//! rest in dependency order. Each migration supports:
//! - a dry-run `preview` that reports what would change
//! - `apply`, which performs the change one document at a time
//! - a `needs_migration` check so an empty run can be recorded without work

mod article_author;
mod ledger;
mod registry;
mod user_profile;

use async_trait::async_trait;
use tbio_docs::DocumentStore;

use crate::ProfileError;

pub use article_author::{ADD_BLOG_PAGE_AUTHOR, ArticleAuthorRewrite};
pub use ledger::{LedgerEntry, MigrationLedger};
pub use registry::{
    MigrationOptions, MigrationOutcome, MigrationRegistry, MigrationStatus, OutcomeKind, RunRequest,
};
pub use user_profile::{ADD_USER_PROFILE, UserProfileBackfill};

/// Preview of what a migration would change.
#[derive(Debug, Clone, Default)]
pub struct MigrationPreview {
    /// Number of records that would be updated.
    pub records_to_update: usize,
    /// Human-readable descriptions of changes.
    pub changes: Vec<String>,
}

/// Result of applying a migration.
#[derive(Debug, Clone, Default)]
pub struct MigrationResult {
    /// Number of records that were inserted or replaced.
    pub records_updated: usize,
    /// Conditions worth an operator's attention that did not stop the run.
    pub warnings: Vec<String>,
}

/// A named data migration over the document store.
#[async_trait]
pub trait Migration: Send + Sync {
    /// Unique name for this migration.
    fn name(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// Names of migrations that must have run before this one.
    fn depends_on(&self) -> &'static [&'static str] {
        &[]
    }

    /// Check if this migration has anything to do.
    async fn needs_migration(&self, store: &dyn DocumentStore) -> Result<bool, ProfileError>;

    /// Preview what would change (dry-run).
    async fn preview(&self, store: &dyn DocumentStore) -> Result<MigrationPreview, ProfileError>;

    /// Apply the migration.
    async fn apply(&self, store: &dyn DocumentStore) -> Result<MigrationResult, ProfileError>;
}

/// Register the profile backfill migrations.
pub fn register_profile_migrations(registry: &mut MigrationRegistry) -> Result<(), ProfileError> {
    let options = MigrationOptions { safe: true };
    registry.register(std::sync::Arc::new(UserProfileBackfill), options)?;
    registry.register(std::sync::Arc::new(ArticleAuthorRewrite), options)?;
    Ok(())
}
