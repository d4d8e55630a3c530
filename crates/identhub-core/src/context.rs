//! Explicit request context passed into every operation.
//!
//! There is no ambient/thread-local tenant state anywhere in IdentHub:
//! the transport layer builds a [`RequestContext`] per inbound request and
//! every service method receives it as an argument.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::result::AppResult;

/// Identifier of the distinguished root tenant, which is exempt from the
/// active/expiry lifecycle checks applied to ordinary tenants.
pub const ROOT_TENANT_ID: &str = "root";

/// Context for the current request.
///
/// Carries the resolved tenant, the caller (absent for anonymous flows such
/// as login), and the client fingerprint inputs. Built by middleware and
/// passed into service methods so that every operation knows *who* is
/// acting and *where* from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The tenant identifier resolved for this request, if any.
    pub tenant_id: Option<String>,
    /// The authenticated caller's user ID. `None` for anonymous flows.
    pub caller_id: Option<Uuid>,
    /// IP address of the request origin.
    pub ip_address: Option<String>,
    /// User-Agent header value.
    pub user_agent: Option<String>,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Context for an anonymous flow (login, refresh).
    pub fn anonymous(
        tenant_id: impl Into<String>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            caller_id: None,
            ip_address,
            user_agent,
            request_time: Utc::now(),
        }
    }

    /// Context for an authenticated flow (session/user management).
    pub fn authenticated(
        tenant_id: impl Into<String>,
        caller_id: Uuid,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            caller_id: Some(caller_id),
            ip_address,
            user_agent,
            request_time: Utc::now(),
        }
    }

    /// The tenant identifier, or `Unauthorized` when missing or blank.
    pub fn require_tenant(&self) -> AppResult<&str> {
        match self.tenant_id.as_deref() {
            Some(tenant) if !tenant.trim().is_empty() => Ok(tenant),
            _ => Err(AppError::unauthorized("tenant context is missing or invalid")),
        }
    }

    /// The caller's user ID, or `Unauthorized` when the flow is anonymous.
    pub fn require_caller(&self) -> AppResult<Uuid> {
        self.caller_id
            .ok_or_else(|| AppError::unauthorized("caller identity is missing"))
    }

    /// Whether this request runs under the distinguished root tenant.
    pub fn is_root_tenant(&self) -> bool {
        self.tenant_id.as_deref() == Some(ROOT_TENANT_ID)
    }
}
