//! Property-based tests for the profile migrations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{Value, json};
use tbio_docs::{
    ARTICLE_TYPE, Article, Document, Filter, MemoryStore, PROFILE_TYPE, Profile,
    USER_TYPE,
};
use tbio_profiles::migrations::register_profile_migrations;
use tbio_profiles::{MigrationRegistry, RunRequest, profile_slug};

// Strategy for generating user slugs, with and without the `user-` prefix
fn user_slug() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9-]{0,12}".prop_map(|s| format!("user-{}", s)),
        "[a-z][a-z0-9-]{0,12}",
        Just("user-".to_string()),
    ]
}

// Strategy for an article's author reference, given the number of users:
// a known user, an unknown id, a null, or no reference at all
fn author_ref(users: usize) -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        (0..users).prop_map(|i| Some(json!(format!("u{}", i)))),
        Just(Some(json!("unknown"))),
        Just(Some(Value::Null)),
        Just(None),
    ]
}

// Strategy for a site: users (some already with profiles) and their articles
fn site() -> impl Strategy<Value = Vec<Document>> {
    (1usize..12).prop_flat_map(|users| {
        (
            prop::collection::vec((user_slug(), any::<bool>()), users),
            prop::collection::vec(author_ref(users), 0..20),
        )
            .prop_map(|(users, articles)| {
                let mut docs = Vec::new();
                for (i, (slug, has_profile)) in users.into_iter().enumerate() {
                    docs.push(doc(json!({
                        "_id": format!("u{}", i),
                        "type": USER_TYPE,
                        "slug": slug,
                        "title": format!("User {}", i),
                    })));
                    if has_profile {
                        docs.push(doc(json!({
                            "_id": format!("p{}", i),
                            "type": PROFILE_TYPE,
                            "userId": format!("u{}", i),
                        })));
                    }
                }
                for (i, author) in articles.into_iter().enumerate() {
                    let mut article = doc(json!({"_id": format!("a{}", i), "type": ARTICLE_TYPE}));
                    if let Some(author) = author {
                        article.set("userId", author);
                    }
                    docs.push(article);
                }
                docs
            })
    })
}

fn doc(value: Value) -> Document {
    Document::try_from(value).unwrap()
}

fn migrate(store: Arc<MemoryStore>) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let mut registry = MigrationRegistry::new(store);
        register_profile_migrations(&mut registry).unwrap();
        registry.migrate(&RunRequest::default()).await.unwrap();
    });
}

fn snapshot(store: &MemoryStore) -> Vec<Document> {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(store.snapshot())
}

fn of_type<T: serde::de::DeserializeOwned>(docs: &[Document], doc_type: &str) -> Vec<T> {
    let filter = Filter::of_type(doc_type);
    docs.iter()
        .filter(|d| filter.matches(d))
        .map(|d| d.decode().unwrap())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn profile_slug_strips_one_prefix(slug in user_slug()) {
        let stripped = profile_slug(&slug);
        prop_assert!(slug.ends_with(stripped));
        if let Some(rest) = slug.strip_prefix("user-") {
            prop_assert_eq!(stripped, rest);
        } else {
            prop_assert_eq!(stripped, slug.as_str());
        }
    }

    #[test]
    fn every_user_ends_with_exactly_one_profile(docs in site()) {
        let store = Arc::new(MemoryStore::with_documents(docs));
        migrate(Arc::clone(&store));

        let after = snapshot(&store);
        let users: Vec<tbio_docs::User> = of_type(&after, USER_TYPE);
        let profiles: Vec<Profile> = of_type(&after, PROFILE_TYPE);

        let mut owners: HashMap<&str, usize> = HashMap::new();
        for profile in &profiles {
            *owners.entry(profile.user_id.as_str()).or_default() += 1;
        }
        for user in &users {
            prop_assert_eq!(owners.get(user.id.as_str()).copied(), Some(1));
        }
        prop_assert_eq!(profiles.len(), users.len());
    }

    #[test]
    fn articles_point_at_their_authors_profile(docs in site()) {
        let before: HashMap<String, Option<Value>> = docs
            .iter()
            .filter(|d| d.doc_type() == Some(ARTICLE_TYPE))
            .map(|d| (d.id().unwrap().to_string(), d.get("userId").cloned()))
            .collect();

        let store = Arc::new(MemoryStore::with_documents(docs));
        migrate(Arc::clone(&store));
        let after = snapshot(&store);

        let profile_by_user: HashMap<String, String> = of_type::<Profile>(&after, PROFILE_TYPE)
            .into_iter()
            .map(|p| (p.user_id, p.id))
            .collect();
        let articles: Vec<Article> = of_type(&after, ARTICLE_TYPE);
        prop_assert_eq!(articles.len(), before.len());

        for article in &articles {
            let original = &before[&article.id];
            let expected_profile = original
                .as_ref()
                .and_then(Value::as_str)
                .and_then(|user_id| profile_by_user.get(user_id));
            match expected_profile {
                Some(profile_id) => {
                    prop_assert!(article.user_id.is_none());
                    prop_assert_eq!(article.user_profile_id.as_ref(), Some(profile_id));
                }
                None => {
                    // Orphans and articles without an author are untouched.
                    let raw = after.iter().find(|d| d.id() == Some(article.id.as_str())).unwrap();
                    prop_assert_eq!(raw.get("userId"), original.as_ref());
                    prop_assert!(!raw.contains("userProfileId"));
                }
            }
        }
    }

    #[test]
    fn migrating_twice_changes_nothing(docs in site()) {
        let store = Arc::new(MemoryStore::with_documents(docs));
        migrate(Arc::clone(&store));
        let first = snapshot(&store);

        // A fresh registry over the migrated data, with the ledger removed,
        // still finds nothing to change.
        let without_ledger: Vec<Document> = first
            .iter()
            .filter(|d| d.doc_type() != Some(tbio_docs::MIGRATION_TYPE))
            .cloned()
            .collect();
        let rerun = Arc::new(MemoryStore::with_documents(without_ledger.clone()));
        migrate(Arc::clone(&rerun));
        let second: Vec<Document> = snapshot(&rerun)
            .into_iter()
            .filter(|d| d.doc_type() != Some(tbio_docs::MIGRATION_TYPE))
            .collect();

        prop_assert_eq!(second, without_ledger);

        let profile_ids: HashSet<&str> = first
            .iter()
            .filter(|d| d.doc_type() == Some(PROFILE_TYPE))
            .filter_map(Document::id)
            .collect();
        prop_assert_eq!(profile_ids.len(), of_type::<Profile>(&first, PROFILE_TYPE).len());
    }
}

