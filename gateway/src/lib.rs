pub mod admin;
pub mod config;
pub mod errors;
mod metrics_defs;
pub mod plugins;
pub mod routes;
pub mod scope;

use crate::admin::{AdminClient, PipelineClient, UpstreamError};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(thiserror::Error, Debug)]
pub enum GatewayServiceError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn run(config: config::Config) -> Result<(), GatewayServiceError> {
    let admin = AdminClient::new(
        config.admin.url.clone(),
        config.admin.token.clone(),
        Duration::from_secs(config.admin.timeout_secs),
    )?;
    let pipeline = PipelineClient::new(
        config.pipeline.url.clone(),
        Duration::from_secs(config.pipeline.timeout_secs),
    )?;

    let app = routes::router(routes::AppState { admin, pipeline });
    let addr = format!("{}:{}", config.listener.host, config.listener.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}
