//! The `serve` subcommand.

use std::net::SocketAddr;
use std::sync::Arc;

use miette::Result;
use tbio_web::AppState;

use crate::site::Site;

pub async fn run(site: Site, listen: SocketAddr) -> Result<()> {
    let state = AppState {
        pipeline: Arc::clone(&site.pipeline),
    };
    tbio_web::serve(listen, state)
        .await
        .map_err(|e| miette::miette!("{}", e))
}
