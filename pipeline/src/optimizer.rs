//! Client for the external budget-optimization engine.
//!
//! Pure request/response: no retries and no local state. Any non-success
//! response or transport failure (including timeout) aborts the caller's
//! pipeline run.

use crate::key::UnitKey;
use crate::metrics_defs::OPTIMIZE_DURATION;
use http::StatusCode;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use shared::histogram;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// One addressable combination of channel/campaign/segment/moment/creative/
/// offer/inventory eligible for budget, plus its descriptive attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationUnit {
    pub channel: String,
    pub campaign_id: String,
    pub segment_id: String,
    pub moment: String,
    pub creative_id: String,
    pub offer_id: String,
    #[serde(default)]
    pub inventory_id: String,
    #[serde(default)]
    pub inventory_type: String,
    #[serde(default)]
    pub operator_id: String,
    #[serde(default)]
    pub inventory_owner_id: String,
    #[serde(default)]
    pub rights_type: String,
    #[serde(default)]
    pub placement_ref: String,
    pub format_compatible: bool,
    pub category_allowed: bool,
}

impl AllocationUnit {
    pub fn key(&self) -> UnitKey {
        UnitKey {
            channel: self.channel.clone(),
            campaign_id: self.campaign_id.clone(),
            segment_id: self.segment_id.clone(),
            moment: self.moment.clone(),
            creative_id: self.creative_id.clone(),
            offer_id: self.offer_id.clone(),
            inventory_id: self.inventory_id.clone(),
        }
    }
}

/// Per-unit forecast inputs, keyed by the unit's composite key in the
/// request. Every key in the units set must have a signals entry or the
/// request is malformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSignals {
    pub p_action: f64,
    pub ltv_uplift: f64,
    pub margin_rate: f64,
    pub expected_cost_per_action: f64,
    pub max_spend: f64,
    #[serde(default)]
    pub min_spend: f64,
    #[serde(default)]
    pub fatigue_score: f64,
    pub freq_cap_ok: bool,
    pub brand_safe: bool,
    pub eligible: bool,
    pub incrementality: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizeRequest {
    pub total_budget: f64,
    pub exploration_ratio: f64,
    pub units: Vec<AllocationUnit>,
    pub signals: IndexMap<String, UnitSignals>,
    pub operator_id: String,
    pub channel_min: HashMap<String, f64>,
    pub channel_max: HashMap<String, f64>,
    pub campaign_min: HashMap<String, f64>,
    pub campaign_max: HashMap<String, f64>,
    pub moment_multipliers: HashMap<String, f64>,
    /// Previous allocation snapshot, sent for continuity. Currently unused
    /// downstream.
    pub previous_allocations: HashMap<String, f64>,
    /// Gates aggressive reallocation for high-salience moment types.
    pub moment_spike_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptimizeDebug {
    #[serde(default)]
    pub base_ev: HashMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizeResponse {
    /// Composite key -> allocated budget. Decoded into an insertion-ordered
    /// map so ties keep the engine's emission order.
    pub allocations: IndexMap<String, f64>,
    #[serde(default)]
    pub debug: OptimizeDebug,
    pub run_id: String,
}

#[derive(thiserror::Error, Debug)]
pub enum OptimizerError {
    #[error("optimizer unavailable: {status}: {body}")]
    Unavailable { status: StatusCode, body: String },
    #[error("optimizer transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub struct OptimizerClient {
    client: reqwest::Client,
    url: String,
}

impl OptimizerClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self, OptimizerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(OptimizerClient { client, url })
    }

    pub async fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizeResponse, OptimizerError> {
        let started = Instant::now();
        let result = self.client.post(&self.url).json(request).send().await;
        histogram!(OPTIMIZE_DURATION).record(started.elapsed().as_secs_f64());
        let response = result?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OptimizerError::Unavailable { status, body });
        }

        Ok(response.json::<OptimizeResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode as AxumStatus, routing::post};
    use serde_json::{Value, json};

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/optimize")
    }

    fn minimal_request() -> OptimizeRequest {
        OptimizeRequest {
            total_budget: 1000.0,
            exploration_ratio: 0.08,
            units: vec![],
            signals: IndexMap::new(),
            operator_id: "broadcaster_demo".into(),
            channel_min: HashMap::new(),
            channel_max: HashMap::new(),
            campaign_min: HashMap::new(),
            campaign_max: HashMap::new(),
            moment_multipliers: HashMap::new(),
            previous_allocations: HashMap::new(),
            moment_spike_active: false,
        }
    }

    #[tokio::test]
    async fn decodes_success_response_in_wire_order() {
        let body = r#"{
            "allocations": {"b|c|s|m|cr|o": 900.0, "a|c|s|m|cr|o": 500.0},
            "debug": {"base_ev": {"b|c|s|m|cr|o": 3.2}},
            "run_id": "run_1"
        }"#;
        let app = Router::new().route(
            "/optimize",
            post(move |Json(_): Json<Value>| async move {
                ([("content-type", "application/json")], body)
            }),
        );
        let url = spawn(app).await;

        let client = OptimizerClient::new(url, Duration::from_secs(2)).unwrap();
        let response = client.optimize(&minimal_request()).await.unwrap();

        assert_eq!(response.run_id, "run_1");
        let keys: Vec<&String> = response.allocations.keys().collect();
        assert_eq!(keys, ["b|c|s|m|cr|o", "a|c|s|m|cr|o"]);
        assert_eq!(response.debug.base_ev["b|c|s|m|cr|o"], 3.2);
    }

    #[tokio::test]
    async fn non_success_maps_to_unavailable_with_body() {
        let app = Router::new().route(
            "/optimize",
            post(|| async { (AxumStatus::SERVICE_UNAVAILABLE, "engine down") }),
        );
        let url = spawn(app).await;

        let client = OptimizerClient::new(url, Duration::from_secs(2)).unwrap();
        let err = client.optimize(&minimal_request()).await.unwrap_err();

        match err {
            OptimizerError::Unavailable { status, body } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "engine down");
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_engine_is_a_transport_error() {
        let client = OptimizerClient::new(
            "http://127.0.0.1:1/optimize".into(),
            Duration::from_millis(500),
        )
        .unwrap();
        let err = client.optimize(&minimal_request()).await.unwrap_err();
        assert!(matches!(err, OptimizerError::Transport(_)));
    }

    #[test]
    fn optimize_records_call_duration() {
        use metrics::{Counter, Gauge, Histogram, HistogramFn, Key, KeyName, Metadata, SharedString, Unit};
        use parking_lot::Mutex;
        use std::sync::Arc;

        struct Samples(Arc<Mutex<Vec<f64>>>);
        impl HistogramFn for Samples {
            fn record(&self, value: f64) {
                self.0.lock().push(value);
            }
        }

        struct CapturingRecorder(Arc<Mutex<Vec<f64>>>);
        impl metrics::Recorder for CapturingRecorder {
            fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
            fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
            fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
            fn register_counter(&self, _: &Key, _: &Metadata<'_>) -> Counter {
                Counter::noop()
            }
            fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
                Gauge::noop()
            }
            fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
                assert_eq!(key.name(), OPTIMIZE_DURATION.name);
                Histogram::from_arc(Arc::new(Samples(self.0.clone())))
            }
        }

        let samples = Arc::new(Mutex::new(Vec::new()));
        let recorder = CapturingRecorder(samples.clone());
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        // The local recorder is thread-scoped, so the call runs on a
        // current-thread runtime inside its scope.
        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let app = Router::new().route(
                    "/optimize",
                    post(|| async {
                        Json(json!({"allocations": {}, "run_id": "run_t"}))
                    }),
                );
                let url = spawn(app).await;
                let client = OptimizerClient::new(url, Duration::from_secs(2)).unwrap();
                client.optimize(&minimal_request()).await.unwrap();

                // Transport failures are timed too.
                let dead = OptimizerClient::new(
                    "http://127.0.0.1:1/optimize".into(),
                    Duration::from_millis(500),
                )
                .unwrap();
                dead.optimize(&minimal_request()).await.unwrap_err();
            });
        });

        let samples = samples.lock();
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|s| *s >= 0.0));
    }

    #[test]
    fn request_serializes_signal_map_in_insertion_order() {
        let mut request = minimal_request();
        request.signals.insert(
            "z|c|s|m|cr|o".into(),
            UnitSignals {
                p_action: 0.08,
                ltv_uplift: 2200.0,
                margin_rate: 0.35,
                expected_cost_per_action: 20.0,
                max_spend: 30000.0,
                min_spend: 0.0,
                fatigue_score: 0.2,
                freq_cap_ok: true,
                brand_safe: true,
                eligible: true,
                incrementality: 1.0,
            },
        );
        let value = serde_json::to_value(&request).unwrap();
        assert!(value["signals"]["z|c|s|m|cr|o"]["p_action"].as_f64().is_some());
        assert_eq!(value["moment_spike_active"], json!(false));
    }
}
