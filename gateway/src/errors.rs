use crate::admin::UpstreamError;
use crate::scope::ScopeError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Gateway error taxonomy. Validation and authorization failures are
/// decided at the boundary and never forwarded upstream; upstream failures
/// pass their message through as a 500.
#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("{0}")]
    Scope(#[from] ScopeError),
    #[error("tenant_not_found")]
    TenantNotFound,
    #[error("missing_club_tenant_id")]
    MissingClubTenantId,
    #[error("invalid_club_tenant_id")]
    InvalidClubTenantId,
    #[error("missing_kind")]
    MissingKind,
    #[error("{0}")]
    Upstream(#[from] UpstreamError),
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            GatewayError::Scope(err) => err.status(),
            GatewayError::TenantNotFound => StatusCode::NOT_FOUND,
            GatewayError::MissingClubTenantId
            | GatewayError::InvalidClubTenantId
            | GatewayError::MissingKind => StatusCode::BAD_REQUEST,
            GatewayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed upstream");
        }
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}
