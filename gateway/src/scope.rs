//! Tenant-scope authorization.
//!
//! The actor scope is derived once per request from caller-supplied headers.
//! Header-based identity is a stand-in for verified claims; the decision
//! functions below are the policy and must survive any change to how the
//! scope is extracted. Each policy is a pure, total function of the actor
//! scope and the target: same inputs, same decision, no hidden state.

use http::HeaderMap;
use http::StatusCode;

pub const ACTOR_TYPE_HEADER: &str = "x-actor-type";
pub const ACTOR_TENANT_HEADER: &str = "x-actor-tenant-id";
pub const CLUB_TENANT_HEADER: &str = "x-club-tenant-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorType {
    Platform,
    Operator,
    Club,
    Brand,
    Anonymous,
    /// A header value outside the known set. Treated like a tenant actor
    /// for tenant scoping, denied everywhere visibility is enumerated.
    Unknown,
}

impl ActorType {
    fn parse(raw: &str) -> Self {
        match raw {
            "platform" => ActorType::Platform,
            "operator" => ActorType::Operator,
            "club" => ActorType::Club,
            "brand" => ActorType::Brand,
            "" | "anonymous" => ActorType::Anonymous,
            _ => ActorType::Unknown,
        }
    }
}

/// The (type, tenant, club-tenant) triple driving authorization decisions.
/// Computed per request, never cached across requests.
#[derive(Debug, Clone)]
pub struct ActorScope {
    pub actor_type: ActorType,
    pub actor_tenant_id: String,
    pub actor_club_tenant_id: String,
}

impl ActorScope {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let value = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .trim()
                .to_string()
        };
        ActorScope {
            actor_type: ActorType::parse(&value(ACTOR_TYPE_HEADER)),
            actor_tenant_id: value(ACTOR_TENANT_HEADER),
            actor_club_tenant_id: value(CLUB_TENANT_HEADER),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("missing_tenant_id")]
    MissingTenantId,
    #[error("missing_actor_tenant_id")]
    MissingActorTenantId,
    #[error("tenant_scope_forbidden")]
    TenantScopeForbidden,
    #[error("missing_x_club_tenant_id")]
    MissingClubTenantHeader,
    #[error("settlement_scope_forbidden")]
    SettlementScopeForbidden,
}

impl ScopeError {
    pub fn status(&self) -> StatusCode {
        match self {
            ScopeError::MissingTenantId | ScopeError::MissingClubTenantHeader => {
                StatusCode::BAD_REQUEST
            }
            ScopeError::MissingActorTenantId => StatusCode::UNAUTHORIZED,
            ScopeError::TenantScopeForbidden | ScopeError::SettlementScopeForbidden => {
                StatusCode::FORBIDDEN
            }
        }
    }
}

/// Gate for operations under `/tenants/{tenant_id}/...`. Platform and
/// operator actors pass unconditionally; everyone else must present an
/// actor tenant id equal to the target.
pub fn require_tenant_scope(scope: &ActorScope, tenant_id: &str) -> Result<(), ScopeError> {
    if tenant_id.is_empty() {
        return Err(ScopeError::MissingTenantId);
    }
    if matches!(scope.actor_type, ActorType::Platform | ActorType::Operator) {
        return Ok(());
    }
    if scope.actor_tenant_id.is_empty() {
        return Err(ScopeError::MissingActorTenantId);
    }
    if scope.actor_tenant_id != tenant_id {
        return Err(ScopeError::TenantScopeForbidden);
    }
    Ok(())
}

/// What a caller may see of the marketplace rights rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RightsVisibility {
    All,
    OwnedBy(String),
    Nothing,
}

impl RightsVisibility {
    pub fn allows(&self, inventory_owner_id: &str) -> bool {
        match self {
            RightsVisibility::All => true,
            RightsVisibility::OwnedBy(owner) => owner == inventory_owner_id,
            RightsVisibility::Nothing => false,
        }
    }
}

/// Gate for marketplace inventory listing. Clubs see only inventory they
/// own; brands see inventory owned by the club named in their club-tenant
/// header.
pub fn rights_visibility(scope: &ActorScope) -> Result<RightsVisibility, ScopeError> {
    match scope.actor_type {
        ActorType::Platform | ActorType::Operator | ActorType::Anonymous => {
            Ok(RightsVisibility::All)
        }
        ActorType::Club => Ok(RightsVisibility::OwnedBy(scope.actor_tenant_id.clone())),
        ActorType::Brand => {
            if scope.actor_club_tenant_id.is_empty() {
                Err(ScopeError::MissingClubTenantHeader)
            } else {
                Ok(RightsVisibility::OwnedBy(scope.actor_club_tenant_id.clone()))
            }
        }
        ActorType::Unknown => Ok(RightsVisibility::Nothing),
    }
}

/// Gate for settlement run/summary/export.
pub fn require_settlement_scope(scope: &ActorScope) -> Result<(), ScopeError> {
    match scope.actor_type {
        ActorType::Platform | ActorType::Operator | ActorType::Club => Ok(()),
        _ => Err(ScopeError::SettlementScopeForbidden),
    }
}
