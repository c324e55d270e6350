//! HTTP surface of the pipeline service: event injection and result polling.
//!
//! `/events/{topic}` accepts any envelope and fans it out on the bus. There
//! is no authentication on this route yet; it sits inside the trust
//! boundary and is used operationally to inject `moment.detected` events.
//! The polling routes never block: they return the cached envelope or `{}`.

use crate::bus::EventBus;
use crate::cache::LatestResults;
use crate::{TOPIC_ALLOCATION_READY, TOPIC_BIDS_READY};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::events::Envelope;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub bus: Arc<EventBus>,
    pub cache: Arc<LatestResults>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events/{topic}", post(publish_event))
        .route("/latest/allocation", get(latest_allocation))
        .route("/latest/bids", get(latest_bids))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"ok": true}))
}

async fn publish_event(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    Json(event): Json<Envelope<Value>>,
) -> Json<Value> {
    state.bus.publish(&topic, event).await;
    Json(json!({"status": "ok"}))
}

async fn latest_allocation(State(state): State<AppState>) -> Json<Value> {
    Json(cached(&state, TOPIC_ALLOCATION_READY))
}

async fn latest_bids(State(state): State<AppState>) -> Json<Value> {
    Json(cached(&state, TOPIC_BIDS_READY))
}

fn cached(state: &AppState, topic: &str) -> Value {
    state
        .cache
        .get_latest(topic)
        .and_then(|envelope| serde_json::to_value(envelope).ok())
        .unwrap_or_else(|| json!({}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    async fn spawn_api() -> (String, AppState) {
        let state = AppState {
            bus: Arc::new(EventBus::new()),
            cache: Arc::new(LatestResults::new()),
        };
        let app = router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), state)
    }

    #[tokio::test]
    async fn polling_before_any_run_returns_empty_object() {
        let (base, _state) = spawn_api().await;
        let body: Value = reqwest::get(format!("{base}/latest/allocation"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn polling_returns_cached_envelope() {
        let (base, state) = spawn_api().await;
        let envelope = Envelope::new(TOPIC_BIDS_READY, "club_1", "pipeline", json!([]))
            .with_run_id("run_1");
        state.cache.set_latest(TOPIC_BIDS_READY, envelope);

        let body: Value = reqwest::get(format!("{base}/latest/bids"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["run_id"], "run_1");
        assert_eq!(body["event_type"], TOPIC_BIDS_READY);
    }

    #[tokio::test]
    async fn event_injection_acks_even_without_subscribers() {
        let (base, _state) = spawn_api().await;
        let envelope = Envelope::new("moment.detected", "club_1", "test", json!({}));

        let response = reqwest::Client::new()
            .post(format!("{base}/events/moment.detected"))
            .json(&envelope)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "ok");
    }
}
