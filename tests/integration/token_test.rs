//! Integration tests for refresh-token rotation.

use chrono::{Duration, Utc};

use identhub_auth::token::{TokenSigner, hash_refresh_token};
use identhub_core::config::{PasswordPolicyConfig, SessionConfig};
use identhub_core::error::ErrorKind;
use identhub_core::events::{RevocationReason, SecurityEvent};
use identhub_entity::token::ClaimSet;
use identhub_test_support::fixtures;

use crate::helpers::{TENANT, TestStack};

#[tokio::test]
async fn refresh_rotates_the_token_pair() {
    let stack = TestStack::new();
    let user = stack.seed_user("dev@example.com", "pw");
    let login = stack.login("dev@example.com", "pw").await;

    let pair = stack
        .rotator
        .refresh(
            &stack.anon_ctx(),
            &login.tokens.access_token,
            &login.tokens.refresh_token,
        )
        .await
        .expect("rotation should succeed");

    assert_ne!(pair.refresh_token, login.tokens.refresh_token);

    // The stored binding and the session now carry the new hash.
    let new_hash = hash_refresh_token(&pair.refresh_token);
    let stored = stack.stores.user(user.id).unwrap();
    assert_eq!(stored.refresh_token_hash.as_deref(), Some(new_hash.as_str()));

    let session = stack.stores.session(login.session.id).unwrap();
    assert_eq!(session.refresh_token_hash, new_hash);
    assert!(!session.revoked);

    assert!(stack.audit.events().contains(&SecurityEvent::TokenRevoked {
        user_id: Some(user.id),
        tenant_id: Some(TENANT.to_string()),
        reason: RevocationReason::RefreshTokenRotated,
    }));
}

#[tokio::test]
async fn a_used_refresh_token_stops_working() {
    let stack = TestStack::new();
    stack.seed_user("dev@example.com", "pw");
    let login = stack.login("dev@example.com", "pw").await;

    stack
        .rotator
        .refresh(
            &stack.anon_ctx(),
            &login.tokens.access_token,
            &login.tokens.refresh_token,
        )
        .await
        .expect("first rotation should succeed");

    let err = stack
        .rotator
        .refresh(
            &stack.anon_ctx(),
            &login.tokens.access_token,
            &login.tokens.refresh_token,
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert!(err.message.contains("invalid or expired"));
    assert!(stack.audit.events().contains(&SecurityEvent::TokenRevoked {
        user_id: None,
        tenant_id: Some(TENANT.to_string()),
        reason: RevocationReason::InvalidRefreshToken,
    }));
}

#[tokio::test]
async fn refresh_rejects_an_access_token_for_another_user() {
    let stack = TestStack::new();
    let alice = stack.seed_user("alice@example.com", "pw");
    stack.seed_user("bob@example.com", "pw");
    let alice_login = stack.login("alice@example.com", "pw").await;
    let bob_login = stack.login("bob@example.com", "pw").await;

    let err = stack
        .rotator
        .refresh(
            &stack.anon_ctx(),
            &bob_login.tokens.access_token,
            &alice_login.tokens.refresh_token,
        )
        .await
        .unwrap_err();

    assert_eq!(err.message, "Access token subject mismatch.");
    assert!(stack.audit.events().contains(&SecurityEvent::TokenRevoked {
        user_id: Some(alice.id),
        tenant_id: Some(TENANT.to_string()),
        reason: RevocationReason::SubjectMismatch,
    }));

    // Alice's binding survives the failed attempt.
    let stored = stack.stores.user(alice.id).unwrap();
    assert_eq!(
        stored.refresh_token_hash,
        Some(hash_refresh_token(&alice_login.tokens.refresh_token))
    );
}

#[tokio::test]
async fn refresh_is_denied_once_the_session_is_revoked() {
    let stack = TestStack::new();
    let user = stack.seed_user("dev@example.com", "pw");
    let login = stack.login("dev@example.com", "pw").await;

    let revoked = stack
        .sessions
        .revoke_session(&stack.ctx_for(&user), login.session.id, "suspicious device")
        .await
        .unwrap();
    assert!(revoked);

    let err = stack
        .rotator
        .refresh(
            &stack.anon_ctx(),
            &login.tokens.access_token,
            &login.tokens.refresh_token,
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert!(stack.audit.events().contains(&SecurityEvent::TokenRevoked {
        user_id: Some(user.id),
        tenant_id: Some(TENANT.to_string()),
        reason: RevocationReason::SessionRevoked,
    }));
}

#[tokio::test]
async fn untracked_refresh_tokens_are_rejected_by_default() {
    let stack = TestStack::new();
    let refresh_token = "untracked-opaque-token";
    let mut user = fixtures::user(TENANT, "ghost@example.com", "unused");
    user.refresh_token_hash = Some(hash_refresh_token(refresh_token));
    user.refresh_token_expires_at = Some(Utc::now() + Duration::days(3));
    stack.stores.put_user(user.clone());

    let access = stack
        .signer
        .sign(&ClaimSet::for_user(&user, vec![]))
        .unwrap()
        .token;

    let err = stack
        .rotator
        .refresh(&stack.anon_ctx(), &access, refresh_token)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn untracked_refresh_tokens_are_honored_when_configured() {
    let stack = TestStack::with_config(
        SessionConfig {
            allow_untracked_refresh_tokens: true,
            ..SessionConfig::default()
        },
        PasswordPolicyConfig::default(),
    );
    let refresh_token = "untracked-opaque-token";
    let mut user = fixtures::user(TENANT, "ghost@example.com", "unused");
    user.refresh_token_hash = Some(hash_refresh_token(refresh_token));
    user.refresh_token_expires_at = Some(Utc::now() + Duration::days(3));
    stack.stores.put_user(user.clone());

    let access = stack
        .signer
        .sign(&ClaimSet::for_user(&user, vec![]))
        .unwrap()
        .token;

    let pair = stack
        .rotator
        .refresh(&stack.anon_ctx(), &access, refresh_token)
        .await
        .expect("untracked rotation should succeed");

    let stored = stack.stores.user(user.id).unwrap();
    assert_eq!(
        stored.refresh_token_hash,
        Some(hash_refresh_token(&pair.refresh_token))
    );
}

#[tokio::test]
async fn an_expired_refresh_binding_is_rejected() {
    let stack = TestStack::new();
    let refresh_token = "expired-opaque-token";
    let hash = hash_refresh_token(refresh_token);
    let mut user = fixtures::user(TENANT, "late@example.com", "unused");
    user.refresh_token_hash = Some(hash.clone());
    user.refresh_token_expires_at = Some(Utc::now() - Duration::hours(1));
    stack.stores.put_user(user.clone());
    stack.stores.put_session(fixtures::session(&user, &hash));

    let access = stack
        .signer
        .sign(&ClaimSet::for_user(&user, vec![]))
        .unwrap()
        .token;

    let err = stack
        .rotator
        .refresh(&stack.anon_ctx(), &access, refresh_token)
        .await
        .unwrap_err();

    assert!(err.message.contains("invalid or expired"));
}
