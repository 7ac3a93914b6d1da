//! Profile association: one profile per user, one author profile per article.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tbio_docs::{
    DocKind, Document, DocumentStore, Filter, PROFILE_TYPE, Profile, USER_ID_FIELD,
    USER_PROFILE_ID_FIELD, User, generate_id,
};
use tracing::{debug, info};

use crate::hooks::{HookRegistry, InsertHook};
use crate::{ProfileError, RequestContext};

/// Profile slug for a user slug: a single leading `user-` is dropped.
pub fn profile_slug(user_slug: &str) -> &str {
    user_slug.strip_prefix("user-").unwrap_or(user_slug)
}

/// Build the profile for a user.
pub fn new_profile(user: &User, created_at: Option<Value>) -> Profile {
    Profile {
        id: generate_id(),
        doc_type: PROFILE_TYPE.to_string(),
        user_id: user.id.clone(),
        title: user.title.clone(),
        slug: profile_slug(&user.slug).to_string(),
        description: String::new(),
        published: true,
        thumbnail: user.thumbnail.clone(),
        created_at,
        doc_permissions: Vec::new(),
    }
}

/// Id of the first profile owned by `user_id`.
///
/// Only the id is read, so a profile with otherwise malformed fields still
/// counts.
pub async fn find_profile_id(
    store: &dyn DocumentStore,
    user_id: &str,
) -> Result<Option<String>, ProfileError> {
    let filter = Filter::of_type(PROFILE_TYPE).eq(USER_ID_FIELD, user_id);
    Ok(store
        .find_one(filter)
        .await?
        .and_then(|doc| doc.id().map(str::to_string)))
}

/// Register the profile hooks: users get a profile after insert, articles get
/// their author's profile before insert.
pub fn register_hooks(registry: &mut HookRegistry, store: Arc<dyn DocumentStore>) {
    registry.register(
        DocKind::User,
        Arc::new(UserProfileHook::new(Arc::clone(&store))),
    );
    registry.register(DocKind::Article, Arc::new(ArticleAuthorHook::new(store)));
}

/// Creates a profile for every newly inserted user.
///
/// The user is assumed to be new, so no existing profile is looked for.
pub struct UserProfileHook {
    store: Arc<dyn DocumentStore>,
}

impl UserProfileHook {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl InsertHook for UserProfileHook {
    fn name(&self) -> &'static str {
        "user-profile"
    }

    async fn after_insert(
        &self,
        _ctx: &RequestContext,
        doc: &Document,
    ) -> Result<(), ProfileError> {
        let user: User = doc.decode()?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let profile = new_profile(&user, Some(Value::String(now)));

        self.store.insert(Document::encode(&profile)?).await?;
        info!(
            user_id = %user.id,
            profile_id = %profile.id,
            slug = %profile.slug,
            "created profile for new user"
        );
        Ok(())
    }
}

/// Stamps the current user's profile id onto articles before they are stored.
pub struct ArticleAuthorHook {
    store: Arc<dyn DocumentStore>,
}

impl ArticleAuthorHook {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl InsertHook for ArticleAuthorHook {
    fn name(&self) -> &'static str {
        "article-author"
    }

    async fn before_insert(
        &self,
        ctx: &RequestContext,
        doc: &mut Document,
    ) -> Result<(), ProfileError> {
        // Anonymous and system-created articles keep no author.
        let Some(user) = ctx.user() else {
            return Ok(());
        };

        match find_profile_id(self.store.as_ref(), &user.id).await? {
            Some(profile_id) => {
                debug!(user_id = %user.id, profile_id = %profile_id, "attached author profile");
                doc.set(USER_PROFILE_ID_FIELD, profile_id);
            }
            None => {
                debug!(user_id = %user.id, "no profile for author, article stays unattributed");
            }
        }
        Ok(())
    }
}
