//! Migration: rewrite legacy article author references to profile ids.

use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use serde_json::Value;
use tbio_docs::{
    ARTICLE_TYPE, Article, Document, DocumentStore, Filter, PROFILE_TYPE, USER_ID_FIELD,
};
use tracing::{debug, info, warn};

use super::user_profile::unowned_profile_warning;
use super::{ADD_USER_PROFILE, Migration, MigrationPreview, MigrationResult};
use crate::ProfileError;

/// Registered name of [`ArticleAuthorRewrite`].
pub const ADD_BLOG_PAGE_AUTHOR: &str = "profiles.addBlogPageAuthor";

/// Swap `userId` for `userProfileId` on articles written before profiles
/// existed.
///
/// Articles whose user has no profile are left untouched. Depends on
/// [`ADD_USER_PROFILE`]: run before the backfill, every lookup would miss.
pub struct ArticleAuthorRewrite;

/// Profile ids keyed by owning user, plus the users that own more than
/// one and the profiles that name no user.
struct ProfileMap {
    by_user: HashMap<String, String>,
    duplicates: Vec<String>,
    unowned: Vec<String>,
}

/// One planned article rewrite.
struct Rewrite {
    article: Article,
    profile_id: String,
}

/// What the migration would do with the current data.
struct Plan {
    rewrites: Vec<Rewrite>,
    orphans: Vec<Article>,
    duplicate_users: Vec<String>,
    unowned_profiles: Vec<String>,
}

impl ArticleAuthorRewrite {
    /// Articles that still carry the `userId` key, whatever its value.
    async fn unmigrated_articles(store: &dyn DocumentStore) -> Result<Vec<Article>, ProfileError> {
        let mut articles = Vec::new();
        let mut docs = store
            .find(Filter::of_type(ARTICLE_TYPE).exists(USER_ID_FIELD, true))
            .await?;
        while let Some(doc) = docs.try_next().await? {
            articles.push(doc.decode()?);
        }
        Ok(articles)
    }

    /// Map every profile id by its user id. A later profile for the same
    /// user replaces an earlier one.
    ///
    /// Only `_id` and `userId` are read, so a profile with odd values in
    /// its other fields still counts.
    async fn profiles_by_user(store: &dyn DocumentStore) -> Result<ProfileMap, ProfileError> {
        let mut by_user = HashMap::new();
        let mut duplicates = Vec::new();
        let mut unowned = Vec::new();
        let mut docs = store.find(Filter::of_type(PROFILE_TYPE)).await?;
        while let Some(doc) = docs.try_next().await? {
            let profile_id = doc.id().unwrap_or_default().to_string();
            let Some(user_id) = doc.get_str(USER_ID_FIELD) else {
                warn!(profile_id = %profile_id, "profile has no userId, ignoring");
                unowned.push(profile_id);
                continue;
            };
            if let Some(previous) = by_user.insert(user_id.to_string(), profile_id) {
                warn!(
                    user_id = %user_id,
                    replaced_profile = %previous,
                    "user has more than one profile, using the later one"
                );
                duplicates.push(user_id.to_string());
            }
        }
        Ok(ProfileMap {
            by_user,
            duplicates,
            unowned,
        })
    }

    async fn plan(store: &dyn DocumentStore) -> Result<Plan, ProfileError> {
        let articles = Self::unmigrated_articles(store).await?;
        if articles.is_empty() {
            return Ok(Plan {
                rewrites: vec![],
                orphans: vec![],
                duplicate_users: vec![],
                unowned_profiles: vec![],
            });
        }

        let profiles = Self::profiles_by_user(store).await?;
        let mut rewrites = Vec::new();
        let mut orphans = Vec::new();

        for article in articles {
            let profile_id = article
                .user_id
                .as_ref()
                .and_then(Value::as_str)
                .and_then(|user_id| profiles.by_user.get(user_id))
                .cloned();
            match profile_id {
                Some(profile_id) => rewrites.push(Rewrite {
                    article,
                    profile_id,
                }),
                None => orphans.push(article),
            }
        }

        Ok(Plan {
            rewrites,
            orphans,
            duplicate_users: profiles.duplicates,
            unowned_profiles: profiles.unowned,
        })
    }
}

fn orphan_warning(article: &Article) -> String {
    match &article.user_id {
        Some(Value::String(user_id)) => format!(
            "article {} references user {} which has no profile; left unmigrated",
            article.id, user_id
        ),
        None => format!("article {} has an empty userId; left unmigrated", article.id),
        Some(other) => format!(
            "article {} has an invalid userId {}; left unmigrated",
            article.id, other
        ),
    }
}

#[async_trait]
impl Migration for ArticleAuthorRewrite {
    fn name(&self) -> &'static str {
        ADD_BLOG_PAGE_AUTHOR
    }

    fn description(&self) -> &'static str {
        "Replace the legacy userId author reference on articles with userProfileId"
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[ADD_USER_PROFILE]
    }

    async fn needs_migration(&self, store: &dyn DocumentStore) -> Result<bool, ProfileError> {
        Ok(!Self::plan(store).await?.rewrites.is_empty())
    }

    async fn preview(&self, store: &dyn DocumentStore) -> Result<MigrationPreview, ProfileError> {
        let plan = Self::plan(store).await?;
        let mut changes: Vec<String> = plan
            .rewrites
            .iter()
            .map(|r| {
                format!(
                    "Article {}: userId {} -> userProfileId {}",
                    r.article.id,
                    r.article
                        .user_id
                        .as_ref()
                        .and_then(Value::as_str)
                        .unwrap_or_default(),
                    r.profile_id
                )
            })
            .collect();
        changes.extend(plan.orphans.iter().map(orphan_warning));
        changes.extend(plan.unowned_profiles.iter().map(|id| unowned_profile_warning(id)));

        Ok(MigrationPreview {
            records_to_update: plan.rewrites.len(),
            changes,
        })
    }

    async fn apply(&self, store: &dyn DocumentStore) -> Result<MigrationResult, ProfileError> {
        let plan = Self::plan(store).await?;
        info!(
            articles = plan.rewrites.len(),
            orphans = plan.orphans.len(),
            "rewriting article authors"
        );

        let mut updated = 0;
        for Rewrite {
            mut article,
            profile_id,
        } in plan.rewrites
        {
            article.user_id = None;
            article.user_profile_id = Some(profile_id);
            store
                .replace(&article.id, Document::encode(&article)?)
                .await?;
            debug!(article_id = %article.id, "rewrote article author");
            updated += 1;
        }

        let mut warnings: Vec<String> = plan.orphans.iter().map(orphan_warning).collect();
        warnings.extend(plan.duplicate_users.iter().map(|user_id| {
            format!(
                "user {} has more than one profile; articles were attributed to the last one found",
                user_id
            )
        }));
        warnings.extend(plan.unowned_profiles.iter().map(|id| unowned_profile_warning(id)));

        Ok(MigrationResult {
            records_updated: updated,
            warnings,
        })
    }
}
