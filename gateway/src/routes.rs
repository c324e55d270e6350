//! The admin proxy surface.
//!
//! Every tenant-scoped route authorizes first, then forwards to the admin
//! store and reshapes the response the way the consoles expect. No retries,
//! no caching: upstream failures surface as 500 with the upstream message.

use crate::admin::{AdminClient, PipelineClient};
use crate::errors::GatewayError;
use crate::metrics_defs::{SCOPE_ALLOWED, SCOPE_DENIED};
use crate::plugins;
use crate::scope::{
    ActorScope, require_settlement_scope, require_tenant_scope, rights_visibility,
};
use axum::extract::{Path, Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Map, Value, json};
use shared::counter;
use shared::ids::new_id;
use std::collections::HashMap;

#[derive(Clone)]
pub struct AppState {
    pub admin: AdminClient,
    pub pipeline: PipelineClient,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tenants/club/register", post(register_club))
        .route("/tenants/brand/register", post(register_brand))
        .route("/tenants", get(list_tenants))
        .route("/tenants/{tenant_id}/config", get(tenant_config))
        .route(
            "/tenants/{tenant_id}/integrations",
            post(connect_integration).get(list_integrations),
        )
        .route(
            "/tenants/{tenant_id}/campaigns",
            post(create_campaign).get(list_campaigns),
        )
        .route(
            "/tenants/{tenant_id}/segments",
            post(create_segment).get(list_segments),
        )
        .route(
            "/tenants/{tenant_id}/creatives",
            post(create_creative).get(list_creatives),
        )
        .route(
            "/tenants/{tenant_id}/offers",
            post(create_offer).get(list_offers),
        )
        .route("/tenants/{tenant_id}/onboarding/plugins", post(onboard_plugins))
        .route("/marketplace/inventory", get(marketplace_inventory))
        .route(
            "/rights/inventory-access",
            post(create_inventory_access).get(list_inventory_access),
        )
        .route(
            "/finance/revenue-rules",
            post(create_revenue_rule).get(list_revenue_rules),
        )
        .route("/finance/settlement/run", post(settlement_run))
        .route("/finance/settlement/summary", get(settlement_summary))
        .route("/finance/settlement/export", get(settlement_export))
        .route("/latest/allocation", get(latest_allocation))
        .route("/latest/bids", get(latest_bids))
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

/// Permissive CORS for the console origins. Consoles are external
/// collaborators and may be served from anywhere during the pilot.
async fn cors(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return (StatusCode::NO_CONTENT, cors_headers()).into_response();
    }
    let mut response = next.run(request).await;
    for (name, value) in cors_headers() {
        response.headers_mut().insert(name, value);
    }
    response
}

fn cors_headers() -> [(axum::http::HeaderName, HeaderValue); 3] {
    [
        (
            axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ),
        (
            axum::http::header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET,POST,PUT,DELETE,OPTIONS"),
        ),
        (
            axum::http::header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(
                "Content-Type, Authorization, X-Admin-Token, X-Actor-Type, X-Actor-Tenant-Id, X-Club-Tenant-Id",
            ),
        ),
    ]
}

fn authorize_tenant(headers: &HeaderMap, tenant_id: &str) -> Result<ActorScope, GatewayError> {
    let scope = ActorScope::from_headers(headers);
    match require_tenant_scope(&scope, tenant_id) {
        Ok(()) => {
            counter!(SCOPE_ALLOWED).increment(1);
            Ok(scope)
        }
        Err(err) => {
            counter!(SCOPE_DENIED).increment(1);
            Err(err.into())
        }
    }
}

fn body_value(body: Option<Json<Value>>) -> Value {
    body.map(|Json(v)| v).unwrap_or_else(|| json!({}))
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Base object with the request body's fields spread over it, matching the
/// store's `metadata` conventions (body fields win on conflict).
fn spread(base: Value, body: &Value) -> Value {
    let mut map = base.as_object().cloned().unwrap_or_default();
    if let Some(fields) = body.as_object() {
        for (key, value) in fields {
            map.insert(key.clone(), value.clone());
        }
    }
    Value::Object(map)
}

/// Lifts a row's `metadata` fields up next to the row's own fields.
fn flatten_metadata(row: &Value) -> Value {
    let mut map = row.as_object().cloned().unwrap_or_default();
    if let Some(metadata) = row.get("metadata").and_then(Value::as_object) {
        for (key, value) in metadata {
            map.insert(key.clone(), value.clone());
        }
    }
    Value::Object(map)
}

async fn health() -> Json<Value> {
    Json(json!({"ok": true}))
}

async fn register_club(
    State(state): State<AppState>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, GatewayError> {
    let body = body_value(body);
    let tenant_id = new_id("club");
    let name = str_field(&body, "name")
        .or_else(|| str_field(&body, "club_name"))
        .unwrap_or(&tenant_id);
    let payload = json!({
        "tenant_id": tenant_id,
        "name": name,
        "metadata": spread(json!({"type": "club"}), &body),
    });
    let out = state.admin.post("/tenants", &payload).await?;
    Ok(Json(json!({"tenant_id": out["tenant_id"]})))
}

async fn register_brand(
    State(state): State<AppState>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, GatewayError> {
    let body = body_value(body);
    let club_tenant_id = str_field(&body, "club_tenant_id")
        .or_else(|| str_field(&body, "club_id"))
        .ok_or(GatewayError::MissingClubTenantId)?
        .to_string();

    let tenants = state.admin.get_items("/tenants", &[]).await?;
    let club = tenants
        .iter()
        .find(|t| t["tenant_id"] == club_tenant_id.as_str());
    let is_club = club
        .map(|t| t["metadata"]["type"] == "club")
        .unwrap_or(false);
    if !is_club {
        return Err(GatewayError::InvalidClubTenantId);
    }

    let tenant_id = new_id("brand");
    let name = str_field(&body, "name")
        .or_else(|| str_field(&body, "brand_name"))
        .unwrap_or(&tenant_id);
    let payload = json!({
        "tenant_id": tenant_id,
        "name": name,
        "metadata": spread(
            json!({"type": "brand", "club_tenant_id": club_tenant_id}),
            &body,
        ),
    });
    let out = state.admin.post("/tenants", &payload).await?;
    Ok(Json(
        json!({"tenant_id": out["tenant_id"], "club_tenant_id": club_tenant_id}),
    ))
}

async fn list_tenants(State(state): State<AppState>) -> Result<Json<Value>, GatewayError> {
    let tenants = state.admin.get_items("/tenants", &[]).await?;

    let mut normalized = Vec::with_capacity(tenants.len());
    for tenant in tenants {
        let tenant_id = str_field(&tenant, "tenant_id").unwrap_or("").to_string();
        // A tenant whose integrations cannot be fetched still lists, with
        // an empty integrations map.
        let integrations = state
            .admin
            .get_items("/integrations", &[("tenant_id", &tenant_id)])
            .await
            .unwrap_or_default();
        let by_kind = integrations_by_kind(&integrations);

        let mut row = tenant.as_object().cloned().unwrap_or_default();
        row.insert("type".into(), tenant_type(&tenant));
        row.insert("integrations".into(), by_kind);
        normalized.push(Value::Object(row));
    }
    Ok(Json(Value::Array(normalized)))
}

fn tenant_type(tenant: &Value) -> Value {
    tenant["metadata"]["type"]
        .as_str()
        .map(Value::from)
        .unwrap_or_else(|| Value::from("unknown"))
}

fn integrations_by_kind(integrations: &[Value]) -> Value {
    let mut by_kind = Map::new();
    for row in integrations {
        if let Some(kind) = str_field(row, "kind") {
            by_kind.insert(
                kind.to_string(),
                row.get("config").cloned().unwrap_or_else(|| json!({})),
            );
        }
    }
    Value::Object(by_kind)
}

async fn tenant_config(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, GatewayError> {
    authorize_tenant(&headers, &tenant_id)?;

    let tenants = state.admin.get_items("/tenants", &[]).await?;
    let tenant = tenants
        .iter()
        .find(|t| t["tenant_id"] == tenant_id.as_str())
        .ok_or(GatewayError::TenantNotFound)?;

    let integrations = state
        .admin
        .get_items("/integrations", &[("tenant_id", &tenant_id)])
        .await?;

    let mut row = tenant.as_object().cloned().unwrap_or_default();
    row.insert("type".into(), tenant_type(tenant));
    row.insert("integrations".into(), Value::Array(integrations));
    Ok(Json(Value::Object(row)))
}

async fn connect_integration(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, GatewayError> {
    authorize_tenant(&headers, &tenant_id)?;
    let body = body_value(body);
    let kind = str_field(&body, "kind").ok_or(GatewayError::MissingKind)?;
    let config = body.get("config").cloned().unwrap_or_else(|| json!({}));

    state
        .admin
        .post(
            "/integrations",
            &json!({"tenant_id": tenant_id, "kind": kind, "config": config}),
        )
        .await?;
    Ok(Json(json!({"status": "connected", "kind": kind})))
}

async fn list_integrations(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, GatewayError> {
    authorize_tenant(&headers, &tenant_id)?;
    let integrations = state
        .admin
        .get_items("/integrations", &[("tenant_id", &tenant_id)])
        .await?;
    Ok(Json(integrations_by_kind(&integrations)))
}

async fn create_campaign(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, GatewayError> {
    authorize_tenant(&headers, &tenant_id)?;
    let body = body_value(body);
    let payload = json!({
        "campaign_id": str_field(&body, "campaign_id").map(str::to_string).unwrap_or_else(|| new_id("camp")),
        "tenant_id": tenant_id,
        "channel": str_field(&body, "channel").unwrap_or("meta"),
        "name": str_field(&body, "name").unwrap_or("Campaign"),
        "objective": body.get("objective").cloned().unwrap_or(Value::Null),
        "status": str_field(&body, "status").unwrap_or("active"),
        "metadata": body,
    });
    let out = state.admin.post("/campaigns", &payload).await?;
    Ok(Json(out))
}

async fn list_campaigns(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, GatewayError> {
    authorize_tenant(&headers, &tenant_id)?;
    let items = state
        .admin
        .get_items("/campaigns", &[("tenant_id", &tenant_id)])
        .await?;
    Ok(Json(Value::Array(items)))
}

async fn create_segment(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, GatewayError> {
    authorize_tenant(&headers, &tenant_id)?;
    let body = body_value(body);
    let rule = str_field(&body, "rule").unwrap_or("all");
    let payload = json!({
        "segment_id": str_field(&body, "segment_id").map(str::to_string).unwrap_or_else(|| new_id("seg")),
        "tenant_id": tenant_id,
        "name": str_field(&body, "name").unwrap_or("Segment"),
        "definition": spread(json!({"rule": rule}), &body),
    });
    let out = state.admin.post("/segments", &payload).await?;
    Ok(Json(out))
}

async fn list_segments(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, GatewayError> {
    authorize_tenant(&headers, &tenant_id)?;
    let items = state
        .admin
        .get_items("/segments", &[("tenant_id", &tenant_id)])
        .await?;
    let rows = items
        .iter()
        .map(|row| {
            let mut map = row.as_object().cloned().unwrap_or_default();
            let rule = row["definition"]["rule"].as_str().unwrap_or("");
            map.insert("rule".into(), Value::from(rule));
            Value::Object(map)
        })
        .collect();
    Ok(Json(Value::Array(rows)))
}

async fn create_creative(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, GatewayError> {
    authorize_tenant(&headers, &tenant_id)?;
    let body = body_value(body);
    let payload = json!({
        "creative_id": str_field(&body, "creative_id").map(str::to_string).unwrap_or_else(|| new_id("cr")),
        "tenant_id": tenant_id,
        "name": str_field(&body, "name").unwrap_or("Creative"),
        "metadata": body,
    });
    let out = state.admin.post("/creatives", &payload).await?;
    Ok(Json(flatten_metadata(&out)))
}

async fn list_creatives(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, GatewayError> {
    authorize_tenant(&headers, &tenant_id)?;
    let items = state
        .admin
        .get_items("/creatives", &[("tenant_id", &tenant_id)])
        .await?;
    Ok(Json(Value::Array(
        items.iter().map(flatten_metadata).collect(),
    )))
}

async fn create_offer(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, GatewayError> {
    authorize_tenant(&headers, &tenant_id)?;
    let body = body_value(body);
    let payload = json!({
        "offer_id": str_field(&body, "offer_id").map(str::to_string).unwrap_or_else(|| new_id("off")),
        "tenant_id": tenant_id,
        "name": str_field(&body, "name").unwrap_or("Offer"),
        "metadata": body,
    });
    let out = state.admin.post("/offers", &payload).await?;
    Ok(Json(flatten_metadata(&out)))
}

async fn list_offers(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, GatewayError> {
    authorize_tenant(&headers, &tenant_id)?;
    let items = state
        .admin
        .get_items("/offers", &[("tenant_id", &tenant_id)])
        .await?;
    Ok(Json(Value::Array(
        items.iter().map(flatten_metadata).collect(),
    )))
}

async fn onboard_plugins(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, GatewayError> {
    authorize_tenant(&headers, &tenant_id)?;
    let body = body_value(body);
    let items = body
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if items.is_empty() {
        return Ok(Json(json!({"status": "ok", "connected": []})));
    }

    let mut connected = Vec::new();
    for item in items {
        // Unknown or missing plugin ids are skipped, not errors.
        let Some(plugin) = str_field(&item, "plugin_id").and_then(plugins::find) else {
            continue;
        };

        let base = json!({
            "mode": str_field(&item, "mode").unwrap_or("placeholder"),
            "provider": plugin.provider,
            "plugin_id": plugin.plugin_id,
            "base_url": str_field(&item, "base_url").unwrap_or(""),
            "account_id": str_field(&item, "account_id").unwrap_or(""),
            "api_key_ref": str_field(&item, "api_key_ref").unwrap_or(""),
        });
        let config = spread(base, item.get("extra").unwrap_or(&Value::Null));
        // `extra` may override `mode`; report what was actually stored.
        let mode = str_field(&config, "mode").unwrap_or("placeholder").to_string();

        state
            .admin
            .post(
                "/integrations",
                &json!({"tenant_id": tenant_id, "kind": plugin.kind, "config": config}),
            )
            .await?;
        connected.push(json!({
            "plugin_id": plugin.plugin_id,
            "kind": plugin.kind,
            "provider": plugin.provider,
            "mode": mode,
        }));
    }

    Ok(Json(
        json!({"status": "ok", "tenant_id": tenant_id, "connected": connected}),
    ))
}

async fn marketplace_inventory(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, GatewayError> {
    let scope = ActorScope::from_headers(&headers);
    let visibility = rights_visibility(&scope)?;

    let tenants = state.admin.get_items("/tenants", &[]).await?;
    let rights = state.admin.get_items("/inventory-access", &[]).await?;

    let tenant_by_id: HashMap<&str, &Value> = tenants
        .iter()
        .filter_map(|t| str_field(t, "tenant_id").map(|id| (id, t)))
        .collect();

    let rows: Vec<Value> = rights
        .iter()
        .filter(|r| visibility.allows(str_field(r, "inventory_owner_id").unwrap_or("")))
        .map(|r| {
            let operator_id = str_field(r, "operator_id").unwrap_or("");
            let owner_id = str_field(r, "inventory_owner_id").unwrap_or("");
            let owner = tenant_by_id.get(owner_id);
            let owner_meta = |key: &str, fallback: &str| -> Value {
                owner
                    .and_then(|t| t["metadata"][key].as_str())
                    .map(Value::from)
                    .unwrap_or_else(|| Value::from(fallback))
            };
            let name_of = |id: &str| -> Value {
                tenant_by_id
                    .get(id)
                    .and_then(|t| str_field(t, "name"))
                    .map(Value::from)
                    .unwrap_or_else(|| Value::from(id))
            };
            json!({
                "operator_id": operator_id,
                "operator_name": name_of(operator_id),
                "club_tenant_id": owner_id,
                "club_name": name_of(owner_id),
                "sport": owner_meta("sport", "football"),
                "geo": owner_meta("geo", "global"),
                "brand_safety_rating": owner_meta("brand_safety_rating", "A"),
                "inventory_id": r["inventory_id"],
                "rights_type": r["rights_type"],
                "inventory": [{
                    "format": r["inventory_type"],
                    "channels": r.get("allowed_channels").cloned().unwrap_or_else(|| json!([])),
                    "moment_targeting": true,
                }],
            })
        })
        .collect();

    Ok(Json(Value::Array(rows)))
}

async fn create_inventory_access(
    State(state): State<AppState>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, GatewayError> {
    let out = state
        .admin
        .post("/inventory-access", &body_value(body))
        .await?;
    Ok(Json(out))
}

async fn list_inventory_access(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, GatewayError> {
    let mut query = Vec::new();
    if let Some(operator_id) = params.get("operator_id") {
        query.push(("operator_id", operator_id.as_str()));
    }
    let items = state.admin.get_items("/inventory-access", &query).await?;
    Ok(Json(Value::Array(items)))
}

async fn create_revenue_rule(
    State(state): State<AppState>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, GatewayError> {
    let out = state.admin.post("/revenue-rules", &body_value(body)).await?;
    Ok(Json(out))
}

async fn list_revenue_rules(State(state): State<AppState>) -> Result<Json<Value>, GatewayError> {
    let items = state.admin.get_items("/revenue-rules", &[]).await?;
    Ok(Json(Value::Array(items)))
}

fn settlement_date_query(date: Option<&str>) -> Vec<(&'static str, &str)> {
    match date {
        Some(d) => vec![("settlement_date", d)],
        None => vec![],
    }
}

async fn settlement_run(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, GatewayError> {
    require_settlement_scope(&ActorScope::from_headers(&headers))?;
    let body = body_value(body);
    let date = str_field(&body, "settlement_date");
    let out = state
        .admin
        .post_query("/settlement/run", &settlement_date_query(date))
        .await?;
    Ok(Json(out))
}

async fn settlement_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, GatewayError> {
    require_settlement_scope(&ActorScope::from_headers(&headers))?;
    let date = params.get("settlement_date").map(String::as_str);
    let items = state
        .admin
        .get_items("/settlement/summary", &settlement_date_query(date))
        .await?;
    Ok(Json(Value::Array(items)))
}

async fn settlement_export(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, GatewayError> {
    require_settlement_scope(&ActorScope::from_headers(&headers))?;
    let date = params.get("settlement_date").map(String::as_str);
    let csv = state
        .admin
        .get_text("/settlement/export", &settlement_date_query(date))
        .await?;
    Ok(([(CONTENT_TYPE, "text/csv")], csv).into_response())
}

async fn latest_allocation(State(state): State<AppState>) -> Result<Json<Value>, GatewayError> {
    Ok(Json(state.pipeline.latest("/latest/allocation").await?))
}

async fn latest_bids(State(state): State<AppState>) -> Result<Json<Value>, GatewayError> {
    Ok(Json(state.pipeline.latest("/latest/bids").await?))
}
