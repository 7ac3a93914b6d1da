//! Profiles for the t-bio site.
//!
//! Every user has a public profile, and every article points at its author's
//! profile through `userProfileId` so authors can be shown to anonymous
//! readers. This crate provides:
//!
//! - **Hooks**: create a profile when a user is inserted, and stamp the current
//!   user's profile onto articles before they are inserted
//! - **Pipeline**: the insert path that runs those hooks around the store
//! - **Migrations**: backfill profiles for pre-existing users, then rewrite
//!   legacy `userId` author references on articles to `userProfileId`
//! - **Registry**: records which migrations have run and runs the rest in
//!   dependency order

mod context;
mod error;
pub mod hooks;
pub mod migrations;
pub mod profiles;

use std::sync::Arc;

use tbio_docs::DocumentStore;

pub use context::RequestContext;
pub use error::ProfileError;
pub use hooks::{DocumentPipeline, HookRegistry, InsertHook};
pub use migrations::{
    ArticleAuthorRewrite, Migration, MigrationOptions, MigrationOutcome, MigrationPreview,
    MigrationRegistry, MigrationResult, RunRequest, UserProfileBackfill,
};
pub use profiles::{
    ArticleAuthorHook, UserProfileHook, find_profile_id, new_profile, profile_slug,
};

/// Wire the profiles module into a site: register its insert hooks and its
/// migrations against the given store.
pub fn install(
    store: Arc<dyn DocumentStore>,
    hooks: &mut HookRegistry,
    migrations: &mut MigrationRegistry,
) -> Result<(), ProfileError> {
    profiles::register_hooks(hooks, store);
    migrations::register_profile_migrations(migrations)
}
