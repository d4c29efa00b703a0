mod error;
mod extract;
mod habits;
pub mod routes;
mod schedule;
mod stats;
mod tasks;

use crate::config::Config;
use anyhow::{Context, Result};
use axum::Router;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub async fn run_server(config: Arc<Config>) -> Result<()> {
    let port = config.api_port;
    let app: Router = routes::router(routes::ApiState { config });

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API server: {addr}"))?;

    info!(address = %addr, "habitgrid API server started");

    axum::serve(listener, app)
        .await
        .context("API server failed")?;

    Ok(())
}
