//! Web routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tbio_docs::{Comment, Document};
use tbio_profiles::{DocumentPipeline, RequestContext};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::WebError;

/// Path the comment form widget posts to.
pub const COMMENT_SUBMIT_PATH: &str = "/modules/comments-form-widgets/submit";

/// Shared application state.
pub struct AppState {
    pub pipeline: Arc<DocumentPipeline>,
}

/// Create the web router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(COMMENT_SUBMIT_PATH, post(submit_comment))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Body posted by the comment form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSubmission {
    pub comment: String,
    #[serde(default)]
    pub piece_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    status: &'static str,
}

/// The widget only understands `ok` and `error`, always with a 200.
async fn submit_comment(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CommentSubmission>, JsonRejection>,
) -> Json<SubmitResponse> {
    let status = match store_comment(&state, body).await {
        Ok(doc) => {
            info!(id = doc.id().unwrap_or_default(), "comment submitted");
            "ok"
        }
        Err(e) => {
            warn!(error = %e, "comment submission rejected");
            "error"
        }
    };
    Json(SubmitResponse { status })
}

async fn store_comment(
    state: &AppState,
    body: Result<Json<CommentSubmission>, JsonRejection>,
) -> Result<Document, WebError> {
    let Json(submission) = body.map_err(|e| WebError::InvalidBody(e.body_text()))?;

    let comment = submission.comment.trim();
    if comment.is_empty() {
        return Err(WebError::EmptyComment);
    }

    let doc = Document::encode(&Comment::new(comment, submission.piece_id))?;
    Ok(state
        .pipeline
        .insert(&RequestContext::anonymous(), doc)
        .await?)
}
