//! The moment handler: turns a detected live moment into budget decisions.
//!
//! Subscribed to `moment.detected`. A run builds an optimizer request from
//! the catalog, calls the engine, decodes the result maps back into
//! allocation records, then commits: cache overwrite plus downstream
//! publishes. Runs are serialized by a mutex so a later run always wins in
//! full, never partially. A failed run commits nothing and leaves the
//! previous cache entry in place.

use crate::bus::{EventBus, EventHandler};
use crate::cache::LatestResults;
use crate::catalog::CatalogProvider;
use crate::key::UnitKey;
use crate::metrics_defs::RUNS_COMMITTED;
use crate::optimizer::{OptimizeResponse, OptimizerClient};
use crate::{PipelineError, TOPIC_ALLOCATION_READY, TOPIC_BIDS_READY};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::counter;
use shared::events::{Envelope, MomentDetected};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::Mutex;

const SOURCE: &str = "pipeline";
const DEFAULT_TENANT: &str = "club_demo";

/// One decoded allocation row. The set for a run is immutable once
/// published; only the latest-result cache keeps a reference, replaced
/// wholesale by the next run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRecord {
    #[serde(flatten)]
    pub unit: UnitKey,
    pub allocated_budget: f64,
    pub ev: f64,
    pub expected_roas: f64,
    pub expected_acos: f64,
}

pub struct MomentHandler {
    optimizer: OptimizerClient,
    catalog: Arc<dyn CatalogProvider>,
    cache: Arc<LatestResults>,
    bus: Arc<EventBus>,
    run_guard: Mutex<()>,
}

impl MomentHandler {
    pub fn new(
        optimizer: OptimizerClient,
        catalog: Arc<dyn CatalogProvider>,
        cache: Arc<LatestResults>,
        bus: Arc<EventBus>,
    ) -> Self {
        MomentHandler {
            optimizer,
            catalog,
            cache,
            bus,
            run_guard: Mutex::new(()),
        }
    }
}

/// Decodes the optimizer's allocation and base-EV maps into records, sorted
/// descending by allocated budget. The sort is stable: ties keep the
/// engine's emission order.
pub fn decode_records(response: &OptimizeResponse) -> Vec<AllocationRecord> {
    let mut rows = Vec::with_capacity(response.allocations.len());
    for (key, allocated_budget) in &response.allocations {
        let ev = response.debug.base_ev.get(key).copied().unwrap_or(0.0);
        rows.push(AllocationRecord {
            unit: UnitKey::decode(key),
            allocated_budget: *allocated_budget,
            ev,
            expected_roas: ev,
            expected_acos: 0.0,
        });
    }
    rows.sort_by(|a, b| {
        b.allocated_budget
            .partial_cmp(&a.allocated_budget)
            .unwrap_or(Ordering::Equal)
    });
    rows
}

#[async_trait]
impl EventHandler for MomentHandler {
    fn name(&self) -> &'static str {
        "moment_handler"
    }

    async fn handle(&self, event: Envelope<Value>) -> Result<(), PipelineError> {
        let moment: MomentDetected = serde_json::from_value(event.payload.clone())?;

        // One run at a time: request assembly, the optimizer call and the
        // commit all happen under the guard so interleaved triggers cannot
        // mix two runs' results in the cache.
        let _run = self.run_guard.lock().await;

        let request = self.catalog.build_request(&moment);
        let response = self.optimizer.optimize(&request).await.map_err(|err| {
            tracing::error!(
                event_id = %event.event_id,
                error = %err,
                "optimizer call failed, dropping run"
            );
            err
        })?;

        let records = decode_records(&response);
        let tenant_id = if event.tenant_id.is_empty() {
            DEFAULT_TENANT
        } else {
            &event.tenant_id
        };

        let allocation_event = Envelope::new(
            TOPIC_ALLOCATION_READY,
            tenant_id,
            SOURCE,
            serde_json::to_value(&records)?,
        )
        .with_run_id(&response.run_id);

        // Bid computation is an unimplemented extension point: the payload
        // stays empty by design.
        let bids_event = Envelope::new(TOPIC_BIDS_READY, tenant_id, SOURCE, Value::Array(vec![]))
            .with_run_id(&response.run_id);

        self.cache
            .set_latest(TOPIC_ALLOCATION_READY, allocation_event.clone());
        self.cache.set_latest(TOPIC_BIDS_READY, bids_event.clone());

        self.bus.publish(TOPIC_ALLOCATION_READY, allocation_event).await;
        self.bus.publish(TOPIC_BIDS_READY, bids_event).await;

        counter!(RUNS_COMMITTED).increment(1);
        tracing::info!(
            run_id = %response.run_id,
            records = records.len(),
            event_id = %event.event_id,
            "allocation run committed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TOPIC_MOMENT_DETECTED;
    use crate::catalog::FixtureCatalog;
    use crate::testutils::moment;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use parking_lot::Mutex as SyncMutex;
    use serde_json::json;
    use shared::events::MomentType;
    use std::time::Duration;

    type Captured = Arc<SyncMutex<Vec<Value>>>;

    async fn spawn_engine(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/optimize")
    }

    /// Mock engine that records request bodies and answers with a canned
    /// response.
    async fn spawn_recording_engine(response: Value) -> (String, Captured) {
        let captured: Captured = Arc::new(SyncMutex::new(Vec::new()));
        let seen = captured.clone();
        let app = Router::new().route(
            "/optimize",
            post(move |Json(body): Json<Value>| {
                let seen = seen.clone();
                let response = response.clone();
                async move {
                    seen.lock().push(body);
                    Json(response)
                }
            }),
        );
        (spawn_engine(app).await, captured)
    }

    async fn pipeline_with_engine(url: String) -> (Arc<EventBus>, Arc<LatestResults>) {
        let bus = Arc::new(EventBus::new());
        let cache = Arc::new(LatestResults::new());
        let client = OptimizerClient::new(url, Duration::from_secs(2)).unwrap();
        let handler = Arc::new(MomentHandler::new(
            client,
            Arc::new(FixtureCatalog),
            cache.clone(),
            bus.clone(),
        ));
        bus.subscribe(TOPIC_MOMENT_DETECTED, handler);
        (bus, cache)
    }

    fn moment_event(moment_type: MomentType) -> Envelope<Value> {
        Envelope::new(
            TOPIC_MOMENT_DETECTED,
            "club_1",
            "test",
            serde_json::to_value(moment(moment_type)).unwrap(),
        )
    }

    fn engine_response(run_id: &str) -> Value {
        json!({
            "allocations": {
                "inapp|camp_1|seg_hardcore|team_success|cr_upbeat|off_merch|inv_owned_app": 40000.0,
                "meta|camp_1|seg_casual|team_success|cr_consoling|off_merch|inv_gam_home": 10000.0
            },
            "debug": {
                "base_ev": {
                    "inapp|camp_1|seg_hardcore|team_success|cr_upbeat|off_merch|inv_owned_app": 3.1
                }
            },
            "run_id": run_id
        })
    }

    #[test]
    fn records_sort_descending_with_stable_ties() {
        // Raw map order B, C, A with a tie between B and C.
        let body = r#"{
            "allocations": {"b|c|s|m|cr|o": 900.0, "c|c|s|m|cr|o": 900.0, "a|c|s|m|cr|o": 500.0},
            "run_id": "run_ties"
        }"#;
        let response: OptimizeResponse = serde_json::from_str(body).unwrap();
        let records = decode_records(&response);

        let channels: Vec<&str> = records.iter().map(|r| r.unit.channel.as_str()).collect();
        assert_eq!(channels, ["b", "c", "a"]);
        assert_eq!(records[2].allocated_budget, 500.0);
        // Missing base_ev entries decode to zero.
        assert_eq!(records[0].ev, 0.0);
    }

    #[tokio::test]
    async fn spike_moment_sets_flag_and_caches_result() {
        let (url, captured) = spawn_recording_engine(engine_response("run_7")).await;
        let (bus, cache) = pipeline_with_engine(url).await;

        bus.publish(TOPIC_MOMENT_DETECTED, moment_event(MomentType::TeamSuccess))
            .await;

        let requests = captured.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["moment_spike_active"], json!(true));
        drop(requests);

        let latest = cache.get_latest(TOPIC_ALLOCATION_READY).unwrap();
        assert_eq!(latest.run_id.as_deref(), Some("run_7"));
        assert_eq!(latest.event_type, TOPIC_ALLOCATION_READY);
        assert_eq!(latest.tenant_id, "club_1");

        let records: Vec<AllocationRecord> =
            serde_json::from_value(latest.payload).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].allocated_budget, 40000.0);
        assert_eq!(records[0].unit.channel, "inapp");
        assert_eq!(records[0].ev, 3.1);

        let bids = cache.get_latest(TOPIC_BIDS_READY).unwrap();
        assert_eq!(bids.run_id.as_deref(), Some("run_7"));
        assert_eq!(bids.payload, json!([]));
    }

    #[tokio::test]
    async fn second_publish_fully_replaces_the_first() {
        let (url_a, _) = spawn_recording_engine(engine_response("run_a")).await;
        let (bus, cache) = pipeline_with_engine(url_a).await;

        bus.publish(TOPIC_MOMENT_DETECTED, moment_event(MomentType::TeamSuccess))
            .await;
        let first = cache.get_latest(TOPIC_ALLOCATION_READY).unwrap();

        bus.publish(TOPIC_MOMENT_DETECTED, moment_event(MomentType::TeamSuccess))
            .await;
        let second = cache.get_latest(TOPIC_ALLOCATION_READY).unwrap();

        assert_ne!(first.event_id, second.event_id);
        assert_eq!(second.run_id.as_deref(), Some("run_a"));
    }

    #[tokio::test]
    async fn failed_run_leaves_previous_cache_entry() {
        let (url, _) = spawn_recording_engine(engine_response("run_ok")).await;
        let (bus, cache) = pipeline_with_engine(url).await;
        bus.publish(TOPIC_MOMENT_DETECTED, moment_event(MomentType::TeamSuccess))
            .await;
        let before = cache.get_latest(TOPIC_ALLOCATION_READY).unwrap();

        // Point a second pipeline at a failing engine but share the cache by
        // swapping the subscriber: simplest is a fresh handler on the same
        // bus/cache with a dead endpoint.
        let failing = Router::new().route(
            "/optimize",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let failing_url = spawn_engine(failing).await;
        let bus2 = Arc::new(EventBus::new());
        let client = OptimizerClient::new(failing_url, Duration::from_secs(2)).unwrap();
        let handler = Arc::new(MomentHandler::new(
            client,
            Arc::new(FixtureCatalog),
            cache.clone(),
            bus2.clone(),
        ));
        bus2.subscribe(TOPIC_MOMENT_DETECTED, handler);

        bus2.publish(TOPIC_MOMENT_DETECTED, moment_event(MomentType::TeamSuccess))
            .await;

        let after = cache.get_latest(TOPIC_ALLOCATION_READY).unwrap();
        assert_eq!(before.event_id, after.event_id);
        assert_eq!(after.run_id.as_deref(), Some("run_ok"));
    }

    #[tokio::test]
    async fn failed_run_with_empty_cache_stays_empty() {
        let failing = Router::new().route(
            "/optimize",
            post(|| async { (StatusCode::BAD_GATEWAY, "no engine") }),
        );
        let url = spawn_engine(failing).await;
        let (bus, cache) = pipeline_with_engine(url).await;

        bus.publish(TOPIC_MOMENT_DETECTED, moment_event(MomentType::TurningPoint))
            .await;

        assert!(cache.get_latest(TOPIC_ALLOCATION_READY).is_none());
        assert!(cache.get_latest(TOPIC_BIDS_READY).is_none());
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected_without_engine_call() {
        let (url, captured) = spawn_recording_engine(engine_response("run_x")).await;
        let (bus, cache) = pipeline_with_engine(url).await;

        let bogus = Envelope::new(
            TOPIC_MOMENT_DETECTED,
            "club_1",
            "test",
            json!({"not": "a moment"}),
        );
        bus.publish(TOPIC_MOMENT_DETECTED, bogus).await;

        assert!(captured.lock().is_empty());
        assert!(cache.get_latest(TOPIC_ALLOCATION_READY).is_none());
    }

    #[tokio::test]
    async fn empty_tenant_falls_back_to_default() {
        let (url, _) = spawn_recording_engine(engine_response("run_d")).await;
        let (bus, cache) = pipeline_with_engine(url).await;

        let mut event = moment_event(MomentType::TeamSuccess);
        event.tenant_id = String::new();
        bus.publish(TOPIC_MOMENT_DETECTED, event).await;

        let latest = cache.get_latest(TOPIC_ALLOCATION_READY).unwrap();
        assert_eq!(latest.tenant_id, DEFAULT_TENANT);
    }

    #[tokio::test]
    async fn downstream_events_are_published_on_the_bus() {
        struct Sink {
            seen: Captured,
        }

        #[async_trait]
        impl EventHandler for Sink {
            fn name(&self) -> &'static str {
                "sink"
            }
            async fn handle(&self, event: Envelope<Value>) -> Result<(), PipelineError> {
                self.seen.lock().push(json!({
                    "event_type": event.event_type,
                    "run_id": event.run_id,
                }));
                Ok(())
            }
        }

        let (url, _) = spawn_recording_engine(engine_response("run_pub")).await;
        let (bus, _cache) = pipeline_with_engine(url).await;
        let seen: Captured = Arc::new(SyncMutex::new(Vec::new()));
        bus.subscribe(TOPIC_ALLOCATION_READY, Arc::new(Sink { seen: seen.clone() }));
        bus.subscribe(TOPIC_BIDS_READY, Arc::new(Sink { seen: seen.clone() }));

        bus.publish(TOPIC_MOMENT_DETECTED, moment_event(MomentType::TeamSuccess))
            .await;

        let events = seen.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["event_type"], TOPIC_ALLOCATION_READY);
        assert_eq!(events[1]["event_type"], TOPIC_BIDS_READY);
        assert_eq!(events[0]["run_id"], "run_pub");
    }
}
