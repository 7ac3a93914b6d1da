//! Behavioral contract shared by every `DocumentStore` backend.
//!
//! Each check runs against both the in-memory and the SQLite store so the
//! migrations see identical semantics whichever one they are handed.

use futures_util::TryStreamExt;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tbio_docs::{
    ARTICLE_TYPE, Document, DocumentStore, Filter, MemoryStore, PROFILE_TYPE, SqliteStore,
    StoreError, USER_ID_FIELD,
};

fn doc(value: Value) -> Document {
    Document::try_from(value).unwrap()
}

fn ids(docs: &[Document]) -> Vec<String> {
    docs.iter()
        .map(|d| d.id().unwrap_or_default().to_string())
        .collect()
}

async fn insert_assigns_missing_id(store: &dyn DocumentStore) {
    let stored = store
        .insert(doc(json!({"type": PROFILE_TYPE, "userId": "u1"})))
        .await
        .unwrap();

    let id = stored.id().expect("id assigned").to_string();
    let found = store
        .find_one(Filter::new().eq("_id", id.as_str()))
        .await
        .unwrap()
        .expect("stored document is findable");
    assert_eq!(found, stored);
}

async fn insert_rejects_duplicates_and_untyped(store: &dyn DocumentStore) {
    store
        .insert(doc(json!({"_id": "dup", "type": PROFILE_TYPE})))
        .await
        .unwrap();

    let err = store
        .insert(doc(json!({"_id": "dup", "type": PROFILE_TYPE})))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(ref id) if id == "dup"));

    let err = store.insert(doc(json!({"_id": "x"}))).await.unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)));
}

async fn find_preserves_insertion_order(store: &dyn DocumentStore) {
    for i in 0..5 {
        store
            .insert(doc(json!({"_id": format!("a{}", i), "type": ARTICLE_TYPE})))
            .await
            .unwrap();
        store
            .insert(doc(json!({"_id": format!("p{}", i), "type": PROFILE_TYPE})))
            .await
            .unwrap();
    }

    let articles = store.find_all(Filter::of_type(ARTICLE_TYPE)).await.unwrap();
    assert_eq!(ids(&articles), vec!["a0", "a1", "a2", "a3", "a4"]);
}

async fn find_applies_every_condition(store: &dyn DocumentStore) {
    store
        .insert(doc(json!({"_id": "a1", "type": ARTICLE_TYPE, "userId": "u1"})))
        .await
        .unwrap();
    store
        .insert(doc(json!({"_id": "a2", "type": ARTICLE_TYPE, "userProfileId": "p1"})))
        .await
        .unwrap();
    store
        .insert(doc(json!({"_id": "a3", "type": ARTICLE_TYPE, "userId": null})))
        .await
        .unwrap();
    store
        .insert(doc(json!({"_id": "p1", "type": PROFILE_TYPE, "userId": "u1"})))
        .await
        .unwrap();

    let legacy = store
        .find_all(Filter::of_type(ARTICLE_TYPE).exists(USER_ID_FIELD, true))
        .await
        .unwrap();
    assert_eq!(ids(&legacy), vec!["a1", "a3"]);

    let others = store
        .find_all(Filter::of_type(ARTICLE_TYPE).not_in("_id", ["a1", "a3"]))
        .await
        .unwrap();
    assert_eq!(ids(&others), vec!["a2"]);

    let by_user = store
        .find_all(Filter::new().eq(USER_ID_FIELD, "u1"))
        .await
        .unwrap();
    assert_eq!(ids(&by_user), vec!["a1", "p1"]);
}

async fn replace_overwrites_whole_document(store: &dyn DocumentStore) {
    store
        .insert(doc(json!({"_id": "a1", "type": ARTICLE_TYPE, "userId": "u1", "title": "T"})))
        .await
        .unwrap();

    store
        .replace(
            "a1",
            doc(json!({"type": ARTICLE_TYPE, "userProfileId": "p1", "title": "T"})),
        )
        .await
        .unwrap();

    let found = store
        .find_one(Filter::new().eq("_id", "a1"))
        .await
        .unwrap()
        .unwrap();
    assert!(!found.contains(USER_ID_FIELD));
    assert_eq!(found.get_str("userProfileId"), Some("p1"));
    assert_eq!(found.get_str("_id"), Some("a1"));
}

async fn replace_rejects_missing_and_mismatched(store: &dyn DocumentStore) {
    let err = store
        .replace("nope", doc(json!({"type": ARTICLE_TYPE})))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(ref id) if id == "nope"));

    store
        .insert(doc(json!({"_id": "a1", "type": ARTICLE_TYPE})))
        .await
        .unwrap();
    let err = store
        .replace("a1", doc(json!({"_id": "a2", "type": ARTICLE_TYPE})))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)));
}

async fn find_stream_is_lazy_and_complete(store: &dyn DocumentStore) {
    // More than one SQLite page.
    for i in 0..250 {
        store
            .insert(doc(json!({"_id": format!("p{:03}", i), "type": PROFILE_TYPE, "n": i})))
            .await
            .unwrap();
        if i % 3 == 0 {
            store
                .insert(doc(json!({"_id": format!("a{:03}", i), "type": ARTICLE_TYPE})))
                .await
                .unwrap();
        }
    }

    let mut stream = store
        .find(Filter::of_type(PROFILE_TYPE))
        .await
        .unwrap();
    let mut seen = Vec::new();
    while let Some(d) = stream.try_next().await.unwrap() {
        seen.push(d.get("n").and_then(Value::as_i64).unwrap());
    }
    assert_eq!(seen, (0..250).collect::<Vec<_>>());

    let untyped = store
        .find_all(Filter::new().exists("n", false))
        .await
        .unwrap();
    assert_eq!(untyped.len(), 84);
}

macro_rules! contract {
    ($($check:ident),* $(,)?) => {
        mod memory {
            use super::*;
            $(
                #[tokio::test]
                async fn $check() {
                    let store = MemoryStore::new();
                    super::$check(&store).await;
                }
            )*
        }

        mod sqlite {
            use super::*;
            $(
                #[tokio::test]
                async fn $check() {
                    let store = SqliteStore::open_in_memory().unwrap();
                    super::$check(&store).await;
                }
            )*
        }
    };
}

contract!(
    insert_assigns_missing_id,
    insert_rejects_duplicates_and_untyped,
    find_preserves_insertion_order,
    find_applies_every_condition,
    replace_overwrites_whole_document,
    replace_rejects_missing_and_mismatched,
    find_stream_is_lazy_and_complete,
);

#[tokio::test]
async fn sqlite_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docs.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        store
            .insert(doc(json!({"_id": "p1", "type": PROFILE_TYPE, "userId": "u1"})))
            .await
            .unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    let profiles = store.find_all(Filter::of_type(PROFILE_TYPE)).await.unwrap();
    assert_eq!(ids(&profiles), vec!["p1"]);
    assert_eq!(profiles[0].get_str("userId"), Some("u1"));
}
