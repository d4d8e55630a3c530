//! Integration tests for session listing and revocation.

use uuid::Uuid;

use identhub_core::error::ErrorKind;
use identhub_core::events::{PolicyCode, RevocationReason, SecurityEvent};

use crate::helpers::TestStack;

#[tokio::test]
async fn a_user_lists_only_their_own_sessions() {
    let stack = TestStack::new();
    let alice = stack.seed_user("alice@example.com", "pw");
    stack.seed_user("bob@example.com", "pw");
    stack.login("alice@example.com", "pw").await;
    stack.login("alice@example.com", "pw").await;
    stack.login("bob@example.com", "pw").await;

    let sessions = stack
        .sessions
        .get_user_sessions(&stack.ctx_for(&alice), alice.id)
        .await
        .unwrap();

    assert_eq!(sessions.len(), 2);
    assert!(sessions.iter().all(|s| s.user_id == alice.id));
}

#[tokio::test]
async fn listing_another_users_sessions_is_denied() {
    let stack = TestStack::new();
    let alice = stack.seed_user("alice@example.com", "pw");
    let bob = stack.seed_user("bob@example.com", "pw");
    stack.login("alice@example.com", "pw").await;

    let err = stack
        .sessions
        .get_user_sessions(&stack.ctx_for(&bob), alice.id)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert_eq!(err.message, "you can only view your own sessions");
    assert!(stack.audit.events().contains(&SecurityEvent::PolicyFailed {
        actor_id: Some(bob.id),
        target_id: Some(alice.id),
        code: PolicyCode::CrossUserSessionAccess,
    }));
}

#[tokio::test]
async fn admin_listing_includes_identity_fields() {
    let stack = TestStack::new();
    let alice = stack.seed_user("alice@example.com", "pw");
    let bob = stack.seed_user("bob@example.com", "pw");
    stack.login("alice@example.com", "pw").await;

    let entries = stack
        .sessions
        .get_user_sessions_admin(&stack.ctx_for(&bob), alice.id)
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].session.user_id, alice.id);
    assert_eq!(entries[0].user_email, "alice@example.com");
}

#[tokio::test]
async fn revoking_an_own_session_is_idempotent() {
    let stack = TestStack::new();
    let alice = stack.seed_user("alice@example.com", "pw");
    let login = stack.login("alice@example.com", "pw").await;
    let ctx = stack.ctx_for(&alice);

    assert!(stack
        .sessions
        .revoke_session(&ctx, login.session.id, "manual")
        .await
        .unwrap());

    let session = stack.stores.session(login.session.id).unwrap();
    assert!(session.revoked);
    assert_eq!(session.revoked_by, Some(alice.id));
    assert_eq!(session.revoked_reason.as_deref(), Some("manual"));

    assert!(!stack
        .sessions
        .revoke_session(&ctx, login.session.id, "manual")
        .await
        .unwrap());

    let revocations = stack
        .audit
        .events()
        .into_iter()
        .filter(|e| {
            matches!(
                e,
                SecurityEvent::SessionRevoked {
                    reason: RevocationReason::UserLogout,
                    ..
                }
            )
        })
        .count();
    assert_eq!(revocations, 1);
}

#[tokio::test]
async fn revoking_a_missing_session_reports_false() {
    let stack = TestStack::new();
    let alice = stack.seed_user("alice@example.com", "pw");

    let revoked = stack
        .sessions
        .revoke_session(&stack.ctx_for(&alice), Uuid::new_v4(), "manual")
        .await
        .unwrap();

    assert!(!revoked);
    assert!(stack.audit.events().is_empty());
}

#[tokio::test]
async fn revoking_anothers_session_needs_the_admin_surface() {
    let stack = TestStack::new();
    let alice = stack.seed_user("alice@example.com", "pw");
    let bob = stack.seed_user("bob@example.com", "pw");
    let login = stack.login("alice@example.com", "pw").await;

    let err = stack
        .sessions
        .revoke_session(&stack.ctx_for(&bob), login.session.id, "manual")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert_eq!(err.message, "you can only revoke your own sessions");

    let revoked = stack
        .sessions
        .revoke_session_admin(&stack.ctx_for(&bob), login.session.id, "security sweep")
        .await
        .unwrap();
    assert!(revoked);
    assert!(stack.audit.events().contains(&SecurityEvent::SessionRevoked {
        session_id: login.session.id,
        user_id: alice.id,
        revoked_by: bob.id,
        reason: RevocationReason::AdminRevoked,
    }));
}

#[tokio::test]
async fn revoke_all_keeps_the_excepted_session() {
    let stack = TestStack::new();
    let alice = stack.seed_user("alice@example.com", "pw");
    let first = stack.login("alice@example.com", "pw").await;
    let second = stack.login("alice@example.com", "pw").await;
    let current = stack.login("alice@example.com", "pw").await;
    let ctx = stack.ctx_for(&alice);

    let count = stack
        .sessions
        .revoke_all_sessions(&ctx, alice.id, Some(current.session.id), "logout everywhere")
        .await
        .unwrap();
    assert_eq!(count, 2);

    assert!(stack.stores.session(first.session.id).unwrap().revoked);
    assert!(stack.stores.session(second.session.id).unwrap().revoked);
    assert!(!stack.stores.session(current.session.id).unwrap().revoked);

    assert!(stack.audit.events().contains(&SecurityEvent::SessionsRevoked {
        user_id: alice.id,
        revoked_by: alice.id,
        count: 2,
        reason: RevocationReason::UserLogout,
    }));

    // Nothing left to revoke; no second bulk event.
    let count = stack
        .sessions
        .revoke_all_sessions(&ctx, alice.id, Some(current.session.id), "logout everywhere")
        .await
        .unwrap();
    assert_eq!(count, 0);
    let bulk_events = stack
        .audit
        .events()
        .into_iter()
        .filter(|e| matches!(e, SecurityEvent::SessionsRevoked { .. }))
        .count();
    assert_eq!(bulk_events, 1);
}

#[tokio::test]
async fn revoke_all_for_another_user_needs_the_admin_surface() {
    let stack = TestStack::new();
    let alice = stack.seed_user("alice@example.com", "pw");
    let bob = stack.seed_user("bob@example.com", "pw");
    stack.login("alice@example.com", "pw").await;

    let err = stack
        .sessions
        .revoke_all_sessions(&stack.ctx_for(&bob), alice.id, None, "security sweep")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);

    let count = stack
        .sessions
        .revoke_all_sessions_admin(&stack.ctx_for(&bob), alice.id, None, "security sweep")
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert!(stack.audit.events().contains(&SecurityEvent::SessionsRevoked {
        user_id: alice.id,
        revoked_by: bob.id,
        count: 1,
        reason: RevocationReason::AdminRevoked,
    }));
}

#[tokio::test]
async fn get_session_admin_reports_missing_sessions() {
    let stack = TestStack::new();
    let alice = stack.seed_user("alice@example.com", "pw");
    let missing = Uuid::new_v4();

    let err = stack
        .sessions
        .get_session_admin(&stack.ctx_for(&alice), missing)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.message, format!("Session {missing} not found"));
}
