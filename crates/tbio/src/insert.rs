//! The `insert` subcommand.

use std::path::Path;

use miette::{IntoDiagnostic, Result};
use serde_json::Value;
use tbio_docs::{Document, Filter, ID_FIELD, USER_TYPE, User};
use tbio_profiles::RequestContext;
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::site::Site;

/// Insert the documents in `file` through the pipeline and print their ids.
pub async fn run(site: &Site, file: &Path, as_user: Option<&str>) -> Result<()> {
    let input = read_input(file).await?;
    let docs = parse_documents(&input)?;
    let ctx = request_context(site, as_user).await?;

    for id in insert_all(site, &ctx, docs).await? {
        println!("{}", id);
    }
    Ok(())
}

async fn read_input(file: &Path) -> Result<String> {
    if file == Path::new("-") {
        let mut input = String::new();
        tokio::io::stdin()
            .read_to_string(&mut input)
            .await
            .into_diagnostic()?;
        Ok(input)
    } else {
        tokio::fs::read_to_string(file)
            .await
            .map_err(|e| miette::miette!("failed to read {}: {}", file.display(), e))
    }
}

/// One JSON object, or an array of them.
fn parse_documents(input: &str) -> Result<Vec<Document>> {
    let value: Value = serde_json::from_str(input).into_diagnostic()?;
    let values = match value {
        Value::Array(values) => values,
        other => vec![other],
    };
    values
        .into_iter()
        .map(|v| Document::try_from(v).map_err(|e| miette::miette!("{}", e)))
        .collect()
}

async fn request_context(site: &Site, as_user: Option<&str>) -> Result<RequestContext> {
    let Some(user_id) = as_user else {
        return Ok(RequestContext::anonymous());
    };

    let doc = site
        .store
        .find_one(Filter::of_type(USER_TYPE).eq(ID_FIELD, user_id))
        .await
        .map_err(|e| miette::miette!("{}", e))?
        .ok_or_else(|| miette::miette!("Unknown user: {}", user_id))?;
    let user: User = doc.decode().map_err(|e| miette::miette!("{}", e))?;
    Ok(RequestContext::authenticated(user))
}

/// Insert sequentially, stopping at the first failure.
async fn insert_all(
    site: &Site,
    ctx: &RequestContext,
    docs: Vec<Document>,
) -> Result<Vec<String>> {
    let mut ids = Vec::with_capacity(docs.len());
    for doc in docs {
        let stored = site
            .pipeline
            .insert(ctx, doc)
            .await
            .map_err(|e| miette::miette!("{}", e))?;
        let id = stored.id().unwrap_or_default().to_string();
        info!(id = %id, doc_type = stored.doc_type().unwrap_or_default(), "inserted");
        ids.push(id);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::sync::Arc;
    use tbio_docs::{MemoryStore, PROFILE_TYPE};

    fn site() -> Site {
        Site::with_store(Arc::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn test_parse_single_and_array() {
        assert_eq!(parse_documents(r#"{"type": "comment"}"#).unwrap().len(), 1);
        assert_eq!(
            parse_documents(r#"[{"type": "comment"}, {"type": "comment"}]"#)
                .unwrap()
                .len(),
            2
        );
        assert!(parse_documents("[1, 2]").is_err());
        assert!(parse_documents("{").is_err());
    }

    #[tokio::test]
    async fn test_insert_user_then_article_as_that_user() {
        let site = site();
        let users = parse_documents(
            r#"{"_id": "u1", "type": "apostrophe-user", "slug": "user-jdoe", "title": "Jane Doe"}"#,
        )
        .unwrap();
        insert_all(&site, &RequestContext::anonymous(), users)
            .await
            .unwrap();

        let profile = site
            .store
            .find_one(Filter::of_type(PROFILE_TYPE))
            .await
            .unwrap()
            .unwrap();

        let ctx = request_context(&site, Some("u1")).await.unwrap();
        let article = parse_documents(r#"{"type": "apostrophe-blog", "title": "Hello"}"#).unwrap();
        let ids = insert_all(&site, &ctx, article).await.unwrap();

        let stored = site
            .store
            .find_one(Filter::new().eq(ID_FIELD, ids[0].as_str()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.get_str("userProfileId"), profile.id());
    }

    #[tokio::test]
    async fn test_unknown_user_is_an_error() {
        let err = request_context(&site(), Some("ghost")).await.unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[tokio::test]
    async fn test_run_reads_file() {
        let site = site();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"type": "comment", "comment": "hi"}}]"#).unwrap();

        run(&site, file.path(), None).await.unwrap();

        let all = site.store.find_all(Filter::new()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].get_str("comment"), Some("hi"));
    }
}
