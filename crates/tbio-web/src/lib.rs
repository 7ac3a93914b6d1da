//! HTTP surface of the t-bio site.
//!
//! Only the public comment form lives here; everything it stores goes through
//! the same [`DocumentPipeline`](tbio_profiles::DocumentPipeline) as any other
//! insert.

mod error;
mod routes;

use std::net::SocketAddr;

use tracing::info;

pub use error::WebError;
pub use routes::{AppState, COMMENT_SUBMIT_PATH, CommentSubmission, create_router};

/// Bind `addr` and serve the router until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), WebError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
