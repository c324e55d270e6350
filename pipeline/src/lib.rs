pub mod api;
pub mod bus;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod handler;
pub mod key;
mod metrics_defs;
pub mod optimizer;
#[cfg(test)]
pub mod testutils;

use crate::bus::EventBus;
use crate::cache::LatestResults;
use crate::catalog::{CatalogProvider, FixtureCatalog};
use crate::handler::MomentHandler;
use crate::optimizer::{OptimizerClient, OptimizerError};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub const TOPIC_MOMENT_DETECTED: &str = "moment.detected";
pub const TOPIC_ALLOCATION_READY: &str = "optimizer.allocation_ready";
pub const TOPIC_BIDS_READY: &str = "bidder.bids_ready";

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("invalid event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn run(config: config::Config) -> Result<(), PipelineError> {
    let client = OptimizerClient::new(
        config.optimizer.url.clone(),
        Duration::from_secs(config.optimizer.timeout_secs),
    )?;
    let catalog: Arc<dyn CatalogProvider> = Arc::new(FixtureCatalog);

    let bus = Arc::new(EventBus::new());
    let cache = Arc::new(LatestResults::new());
    let moment_handler = Arc::new(MomentHandler::new(
        client,
        catalog,
        cache.clone(),
        bus.clone(),
    ));
    bus.subscribe(TOPIC_MOMENT_DETECTED, moment_handler);

    let app = api::router(api::AppState { bus, cache });
    let addr = format!("{}:{}", config.listener.host, config.listener.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "pipeline listening");
    axum::serve(listener, app).await?;
    Ok(())
}
