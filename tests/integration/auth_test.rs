//! Integration tests for the login, logout, and activity flows.

use chrono::{Duration, Utc};

use identhub_auth::password::PasswordStatus;
use identhub_auth::token::{TokenSigner, hash_refresh_token};
use identhub_core::error::ErrorKind;
use identhub_core::events::{DenialReason, PolicyCode, SecurityEvent};
use identhub_database::stores::RoleStore;
use identhub_entity::session::DeviceType;
use identhub_entity::tenant::Tenant;
use identhub_test_support::fixtures;

use crate::helpers::{TENANT, TestStack};

#[tokio::test]
async fn login_returns_tokens_session_and_claims() {
    let stack = TestStack::new();
    let user = stack.seed_user("dev@example.com", "Tr4verse!Quartz$Lamp");
    stack.stores.assign_role(user.id, "editor").await.unwrap();
    stack.stores.put_inherited_roles(user.id, &["editor", "auditor"]);

    let outcome = stack.login("dev@example.com", "Tr4verse!Quartz$Lamp").await;

    assert_eq!(outcome.claims.sub, user.id);
    assert_eq!(outcome.claims.tenant, TENANT);
    // Direct and inherited roles union without duplicates.
    assert_eq!(outcome.claims.roles, vec!["auditor", "editor"]);
    assert_eq!(outcome.password_status, PasswordStatus::Valid);

    let decoded = stack.signer.decode(&outcome.tokens.access_token).unwrap();
    assert_eq!(decoded.jti, outcome.claims.jti);

    let session = stack.stores.session(outcome.session.id).expect("session stored");
    assert_eq!(session.user_id, user.id);
    assert_eq!(
        session.refresh_token_hash,
        hash_refresh_token(&outcome.tokens.refresh_token)
    );
    assert_eq!(session.device_type, DeviceType::Desktop);
    assert_eq!(session.browser.as_deref(), Some("Firefox"));

    let stored = stack.stores.user(user.id).unwrap();
    assert!(stored.has_live_refresh_token(Utc::now()));

    let events = stack.audit.events();
    assert!(events.contains(&SecurityEvent::LoginSucceeded {
        user_id: user.id,
        tenant_id: TENANT.to_string(),
    }));
    assert!(events.contains(&SecurityEvent::TokenIssued {
        user_id: user.id,
        tenant_id: TENANT.to_string(),
        jti: outcome.claims.jti,
    }));
    assert!(events.contains(&SecurityEvent::SessionCreated {
        session_id: outcome.session.id,
        user_id: user.id,
        tenant_id: TENANT.to_string(),
        ip_address: Some("198.51.100.23".to_string()),
    }));
}

#[tokio::test]
async fn login_failures_share_one_generic_message() {
    let stack = TestStack::new();
    stack.seed_user("dev@example.com", "Tr4verse!Quartz$Lamp");

    let wrong = stack
        .auth
        .login(&stack.anon_ctx(), "dev@example.com", "WrongPassw0rd!")
        .await
        .unwrap_err();
    let unknown = stack
        .auth
        .login(&stack.anon_ctx(), "ghost@example.com", "WrongPassw0rd!")
        .await
        .unwrap_err();

    assert_eq!(wrong.kind, ErrorKind::Unauthorized);
    assert_eq!(wrong.message, "invalid email or password");
    assert_eq!(unknown.message, wrong.message);

    // The audit trail still records the concrete reason for each denial.
    let denials = stack
        .audit
        .events()
        .into_iter()
        .filter(|e| {
            matches!(
                e,
                SecurityEvent::LoginDenied {
                    reason: DenialReason::InvalidCredentials,
                    ..
                }
            )
        })
        .count();
    assert_eq!(denials, 2);
}

#[tokio::test]
async fn a_deactivated_user_cannot_login() {
    let stack = TestStack::new();
    let mut user = stack.seed_user("off@example.com", "pw");
    user.active = false;
    stack.stores.put_user(user);

    let err = stack
        .auth
        .login(&stack.anon_ctx(), "off@example.com", "pw")
        .await
        .unwrap_err();

    assert_eq!(err.message, "user is deactivated");
    assert!(stack.audit.events().iter().any(|e| {
        matches!(
            e,
            SecurityEvent::LoginDenied {
                reason: DenialReason::UserDeactivated,
                ..
            }
        )
    }));
}

#[tokio::test]
async fn an_unconfirmed_email_cannot_login() {
    let stack = TestStack::new();
    let mut user = stack.seed_user("new@example.com", "pw");
    user.email_confirmed = false;
    stack.stores.put_user(user);

    let err = stack
        .auth
        .login(&stack.anon_ctx(), "new@example.com", "pw")
        .await
        .unwrap_err();

    assert_eq!(err.message, "email not confirmed");
    assert!(stack.audit.events().iter().any(|e| {
        matches!(
            e,
            SecurityEvent::LoginDenied {
                reason: DenialReason::EmailNotConfirmed,
                ..
            }
        )
    }));
}

#[tokio::test]
async fn login_is_denied_under_an_inactive_tenant() {
    let stack = TestStack::new();
    let mut tenant = fixtures::tenant(TENANT);
    tenant.active = false;
    stack.stores.put_tenant(tenant);
    stack.seed_user("dev@example.com", "pw");

    let err = stack
        .auth
        .login(&stack.anon_ctx(), "dev@example.com", "pw")
        .await
        .unwrap_err();

    assert_eq!(err.message, "tenant acme is deactivated");
    assert!(stack.audit.events().iter().any(|e| {
        matches!(
            e,
            SecurityEvent::LoginDenied {
                reason: DenialReason::TenantDeactivated,
                ..
            }
        )
    }));
}

#[tokio::test]
async fn login_is_denied_under_an_expired_tenant() {
    let stack = TestStack::new();
    let mut tenant = fixtures::tenant(TENANT);
    tenant.valid_until = Some(Utc::now() - Duration::hours(1));
    stack.stores.put_tenant(tenant);
    stack.seed_user("dev@example.com", "pw");

    let err = stack
        .auth
        .login(&stack.anon_ctx(), "dev@example.com", "pw")
        .await
        .unwrap_err();

    assert_eq!(err.message, "tenant acme has expired");
    assert!(stack.audit.events().iter().any(|e| {
        matches!(
            e,
            SecurityEvent::LoginDenied {
                reason: DenialReason::TenantExpired,
                ..
            }
        )
    }));
}

#[tokio::test]
async fn a_tenant_without_a_directory_row_is_denied() {
    let stack = TestStack::new();
    stack.seed_user_in("ghost", "dev@example.com", "pw");

    let err = stack
        .auth
        .login(&stack.anon_ctx_in("ghost"), "dev@example.com", "pw")
        .await
        .unwrap_err();

    assert_eq!(err.message, "tenant context is missing or invalid");
    assert!(stack.audit.events().iter().any(|e| {
        matches!(
            e,
            SecurityEvent::LoginDenied {
                reason: DenialReason::UnknownTenant,
                ..
            }
        )
    }));
}

#[tokio::test]
async fn the_root_tenant_is_exempt_from_lifecycle_checks() {
    let stack = TestStack::new();
    let mut root = fixtures::tenant(Tenant::ROOT_ID);
    root.active = false;
    root.valid_until = Some(Utc::now() - Duration::days(30));
    stack.stores.put_tenant(root);
    let user = stack.seed_user_in(Tenant::ROOT_ID, "ops@example.com", "pw");

    let outcome = stack
        .auth
        .login(&stack.anon_ctx_in(Tenant::ROOT_ID), "ops@example.com", "pw")
        .await
        .expect("root tenant login should succeed");

    assert_eq!(outcome.claims.sub, user.id);
    assert_eq!(outcome.claims.tenant, Tenant::ROOT_ID);
}

#[tokio::test]
async fn a_stale_hash_is_rehashed_on_login() {
    use identhub_test_support::PlainHasher;

    let stack = TestStack::new();
    let user = fixtures::user(
        TENANT,
        "old@example.com",
        &PlainHasher::stale_hash_of("Tr4verse!Quartz$Lamp"),
    );
    let changed_at = user.password_changed_at;
    stack.stores.put_user(user.clone());

    stack.login("old@example.com", "Tr4verse!Quartz$Lamp").await;

    let stored = stack.stores.user(user.id).unwrap();
    assert_eq!(
        stored.password_hash,
        PlainHasher::hash_of("Tr4verse!Quartz$Lamp")
    );
    // Re-hashing is not a password change.
    assert_eq!(stored.password_changed_at, changed_at);
}

#[tokio::test]
async fn logout_revokes_the_tracked_session_once() {
    let stack = TestStack::new();
    let user = stack.seed_user("dev@example.com", "pw");
    let login = stack.login("dev@example.com", "pw").await;
    let ctx = stack.ctx_for(&user);

    assert!(stack.auth.logout(&ctx, &login.tokens.refresh_token).await.unwrap());

    let session = stack.stores.session(login.session.id).unwrap();
    assert!(session.revoked);
    assert_eq!(session.revoked_by, Some(user.id));

    // A second logout with the same token is a quiet no-op.
    assert!(!stack.auth.logout(&ctx, &login.tokens.refresh_token).await.unwrap());

    let revocations = stack
        .audit
        .events()
        .into_iter()
        .filter(|e| matches!(e, SecurityEvent::SessionRevoked { .. }))
        .count();
    assert_eq!(revocations, 1);
}

#[tokio::test]
async fn logout_rejects_a_foreign_refresh_token() {
    let stack = TestStack::new();
    let alice = stack.seed_user("alice@example.com", "pw");
    let bob = stack.seed_user("bob@example.com", "pw");
    let alice_login = stack.login("alice@example.com", "pw").await;

    let err = stack
        .auth
        .logout(&stack.ctx_for(&bob), &alice_login.tokens.refresh_token)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert!(stack.audit.events().contains(&SecurityEvent::PolicyFailed {
        actor_id: Some(bob.id),
        target_id: Some(alice.id),
        code: PolicyCode::CrossUserSessionAccess,
    }));
    assert!(!stack.stores.session(alice_login.session.id).unwrap().revoked);
}

#[tokio::test]
async fn record_activity_touches_the_session() {
    let stack = TestStack::new();
    stack.seed_user("dev@example.com", "pw");
    let login = stack.login("dev@example.com", "pw").await;

    let before = stack.stores.session(login.session.id).unwrap().last_activity_at;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    stack
        .auth
        .record_activity(&stack.anon_ctx(), &login.tokens.refresh_token)
        .await
        .unwrap();

    let after = stack.stores.session(login.session.id).unwrap().last_activity_at;
    assert!(after > before);
}
