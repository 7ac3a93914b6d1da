//! Migration: create profiles for users that predate the profiles module.

use std::collections::HashSet;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use tbio_docs::{
    Document, DocumentStore, Filter, ID_FIELD, PROFILE_TYPE, USER_ID_FIELD, USER_TYPE, User,
};
use tracing::{info, warn};

use super::{Migration, MigrationPreview, MigrationResult};
use crate::ProfileError;
use crate::profiles::{new_profile, profile_slug};

/// Registered name of [`UserProfileBackfill`].
pub const ADD_USER_PROFILE: &str = "profiles.addUserProfile";

/// Backfill one profile for every user that has none.
///
/// Re-running it finds no users to migrate and inserts nothing.
pub struct UserProfileBackfill;

/// Users that need a profile, plus profiles that could not be attributed.
struct Backlog {
    users: Vec<User>,
    unowned_profiles: Vec<String>,
}

impl UserProfileBackfill {
    /// Users not referenced by any profile, in store order.
    ///
    /// Profiles are read only for their `userId`; one without a string
    /// `userId` covers nobody and is reported instead of failing the run.
    async fn backlog(store: &dyn DocumentStore) -> Result<Backlog, ProfileError> {
        let mut covered = HashSet::new();
        let mut unowned_profiles = Vec::new();
        let mut profiles = store.find(Filter::of_type(PROFILE_TYPE)).await?;
        while let Some(doc) = profiles.try_next().await? {
            match doc.get_str(USER_ID_FIELD) {
                Some(user_id) => {
                    covered.insert(user_id.to_string());
                }
                None => {
                    let id = doc.id().unwrap_or_default().to_string();
                    warn!(profile_id = %id, "profile has no userId, ignoring");
                    unowned_profiles.push(id);
                }
            }
        }

        let mut users = Vec::new();
        let mut docs = store
            .find(Filter::of_type(USER_TYPE).not_in(ID_FIELD, covered))
            .await?;
        while let Some(doc) = docs.try_next().await? {
            users.push(doc.decode()?);
        }
        Ok(Backlog {
            users,
            unowned_profiles,
        })
    }
}

pub(super) fn unowned_profile_warning(profile_id: &str) -> String {
    format!("profile {} has no userId; ignored", profile_id)
}

#[async_trait]
impl Migration for UserProfileBackfill {
    fn name(&self) -> &'static str {
        ADD_USER_PROFILE
    }

    fn description(&self) -> &'static str {
        "Create a profile for every existing user that does not have one"
    }

    async fn needs_migration(&self, store: &dyn DocumentStore) -> Result<bool, ProfileError> {
        Ok(!Self::backlog(store).await?.users.is_empty())
    }

    async fn preview(&self, store: &dyn DocumentStore) -> Result<MigrationPreview, ProfileError> {
        let Backlog {
            users,
            unowned_profiles,
        } = Self::backlog(store).await?;
        let mut changes: Vec<String> = users
            .iter()
            .map(|user| {
                format!(
                    "User {} ({}): create profile '{}'",
                    user.title,
                    user.id,
                    profile_slug(&user.slug)
                )
            })
            .collect();
        changes.extend(unowned_profiles.iter().map(|id| unowned_profile_warning(id)));

        Ok(MigrationPreview {
            records_to_update: users.len(),
            changes,
        })
    }

    async fn apply(&self, store: &dyn DocumentStore) -> Result<MigrationResult, ProfileError> {
        let Backlog {
            users,
            unowned_profiles,
        } = Self::backlog(store).await?;
        info!(users = users.len(), "backfilling user profiles");

        let mut created = 0;
        for user in &users {
            // The user's true creation time is unknown; its last update is
            // the closest available approximation, copied as stored.
            let profile = new_profile(user, user.updated_at.clone());
            store.insert(Document::encode(&profile)?).await?;
            info!(user_id = %user.id, profile_id = %profile.id, "created profile");
            created += 1;
        }

        Ok(MigrationResult {
            records_updated: created,
            warnings: unowned_profiles
                .iter()
                .map(|id| unowned_profile_warning(id))
                .collect(),
        })
    }
}
