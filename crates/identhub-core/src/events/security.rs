//! Security event types written to the audit sink.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a login or refresh-token validation was denied.
///
/// Recorded in the audit trail only; the caller always receives a generic
/// unauthorized outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The request carried no usable tenant identifier.
    MissingTenant,
    /// Unknown email or failed password verification.
    InvalidCredentials,
    /// The account exists but is deactivated.
    UserDeactivated,
    /// The account exists but its email is unconfirmed.
    EmailNotConfirmed,
    /// The tenant identifier has no directory record.
    UnknownTenant,
    /// The tenant record is marked inactive.
    TenantDeactivated,
    /// The tenant's validity window has passed.
    TenantExpired,
}

impl DenialReason {
    /// Machine-readable reason code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingTenant => "missing_tenant",
            Self::InvalidCredentials => "invalid_credentials",
            Self::UserDeactivated => "user_deactivated",
            Self::EmailNotConfirmed => "email_not_confirmed",
            Self::UnknownTenant => "unknown_tenant",
            Self::TenantDeactivated => "tenant_deactivated",
            Self::TenantExpired => "tenant_expired",
        }
    }
}

/// Why a token or session stopped being honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    /// The presented refresh token matched no live identity record.
    InvalidRefreshToken,
    /// The session bound to the refresh token was revoked.
    SessionRevoked,
    /// The access-token subject did not match the refresh-token owner.
    SubjectMismatch,
    /// The previous refresh token was retired by a successful rotation.
    RefreshTokenRotated,
    /// The user logged themselves out.
    UserLogout,
    /// An administrator revoked the session.
    AdminRevoked,
}

impl RevocationReason {
    /// Machine-readable reason code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRefreshToken => "invalid_refresh_token",
            Self::SessionRevoked => "session_revoked",
            Self::SubjectMismatch => "subject_mismatch",
            Self::RefreshTokenRotated => "refresh_token_rotated",
            Self::UserLogout => "user_logout",
            Self::AdminRevoked => "admin_revoked",
        }
    }
}

/// Machine-readable code attached to `PolicyFailed` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyCode {
    /// A caller attempted to deactivate their own account.
    SelfDeactivation,
    /// Deactivation would remove the tenant's last active administrator.
    LastAdministrator,
    /// A new password matched one of the retained history hashes.
    PasswordReuse,
    /// A non-admin caller touched another user's sessions.
    CrossUserSessionAccess,
}

impl PolicyCode {
    /// Machine-readable reason code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfDeactivation => "self_deactivation",
            Self::LastAdministrator => "last_administrator",
            Self::PasswordReuse => "password_reuse",
            Self::CrossUserSessionAccess => "cross_user_session_access",
        }
    }
}

/// Events related to credentials, tokens, and sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SecurityEvent {
    /// Credentials validated successfully.
    LoginSucceeded {
        /// The authenticated user.
        user_id: Uuid,
        /// The tenant the login ran under.
        tenant_id: String,
    },
    /// A login attempt was denied.
    LoginDenied {
        /// The tenant the attempt ran under, if resolvable.
        tenant_id: Option<String>,
        /// The normalized email that was attempted, if it got that far.
        email: Option<String>,
        /// Why the attempt was denied.
        reason: DenialReason,
    },
    /// An access/refresh token pair was issued.
    TokenIssued {
        /// The token subject.
        user_id: Uuid,
        /// The tenant the issuance ran under.
        tenant_id: String,
        /// The unique ID of the issued access token.
        jti: Uuid,
    },
    /// A token stopped being honored.
    TokenRevoked {
        /// The affected user, when known.
        user_id: Option<Uuid>,
        /// The tenant, when known.
        tenant_id: Option<String>,
        /// Why the token was revoked.
        reason: RevocationReason,
    },
    /// A session row was created at login.
    SessionCreated {
        /// The session ID.
        session_id: Uuid,
        /// The session owner.
        user_id: Uuid,
        /// The tenant of the session.
        tenant_id: String,
        /// The IP address of the login, when known.
        ip_address: Option<String>,
    },
    /// A single session was revoked.
    SessionRevoked {
        /// The session ID.
        session_id: Uuid,
        /// The session owner.
        user_id: Uuid,
        /// Who revoked it.
        revoked_by: Uuid,
        /// Why it was revoked.
        reason: RevocationReason,
    },
    /// A bulk session revocation completed.
    SessionsRevoked {
        /// The user whose sessions were revoked.
        user_id: Uuid,
        /// Who revoked them.
        revoked_by: Uuid,
        /// How many sessions were revoked.
        count: u64,
        /// Why they were revoked.
        reason: RevocationReason,
    },
    /// A password change completed.
    PasswordChanged {
        /// The user whose password changed.
        user_id: Uuid,
        /// Who performed the change (the user, or an admin on reset).
        changed_by: Uuid,
    },
    /// A policy guard rejected an operation.
    PolicyFailed {
        /// The caller whose operation was rejected, when known.
        actor_id: Option<Uuid>,
        /// The user the operation targeted, when different.
        target_id: Option<Uuid>,
        /// The machine-readable policy code.
        code: PolicyCode,
    },
}
