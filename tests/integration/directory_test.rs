//! Integration tests for user registration, profiles, status, roles, and
//! password management.

use chrono::{Duration, Utc};

use identhub_core::config::{PasswordPolicyConfig, SessionConfig};
use identhub_core::error::ErrorKind;
use identhub_core::events::{PolicyCode, SecurityEvent};
use identhub_core::types::PageRequest;
use identhub_database::stores::RoleStore;
use identhub_entity::user::{ADMIN_ROLE, UpdateUserProfile};
use identhub_service::RegisterUser;
use identhub_test_support::{PlainHasher, fixtures};

use crate::helpers::{TENANT, TestStack};

fn registration(email: &str, username: &str, password: &str) -> RegisterUser {
    RegisterUser {
        email: email.to_string(),
        username: username.to_string(),
        display_name: "Test User".to_string(),
        phone: None,
        image_url: None,
        password: password.to_string(),
        email_confirmed: true,
    }
}

#[tokio::test]
async fn register_normalizes_email_and_allows_login() {
    let stack = TestStack::new();

    let registered = stack
        .directory
        .register_user(
            &stack.anon_ctx(),
            registration(" Mixed@Example.COM ", "mixed", "Tr4verse!Quartz$Lamp"),
        )
        .await
        .unwrap();

    assert_eq!(registered.email, "mixed@example.com");
    assert_eq!(registered.tenant_id, TENANT);
    assert!(registered.active);

    // Self-registration attributes the activity entry to the new account.
    assert!(stack
        .audit
        .activities()
        .iter()
        .any(|a| a.action == "user.registered" && a.actor_id == registered.id));

    stack.login("mixed@example.com", "Tr4verse!Quartz$Lamp").await;
}

#[tokio::test]
async fn duplicate_email_conflicts_within_a_tenant_only() {
    let stack = TestStack::new();
    stack.stores.put_tenant(fixtures::tenant("globex"));
    stack
        .directory
        .register_user(
            &stack.anon_ctx(),
            registration("dev@example.com", "dev", "Tr4verse!Quartz$Lamp"),
        )
        .await
        .unwrap();

    let email_clash = stack
        .directory
        .register_user(
            &stack.anon_ctx(),
            registration("dev@example.com", "dev2", "Tr4verse!Quartz$Lamp"),
        )
        .await
        .unwrap_err();
    assert_eq!(email_clash.kind, ErrorKind::Conflict);
    assert_eq!(email_clash.message, "Email is already registered");

    let username_clash = stack
        .directory
        .register_user(
            &stack.anon_ctx(),
            registration("dev2@example.com", "DEV", "Tr4verse!Quartz$Lamp"),
        )
        .await
        .unwrap_err();
    assert_eq!(username_clash.message, "Username is already taken");

    // The same address is free under another tenant.
    let other = stack
        .directory
        .register_user(
            &stack.anon_ctx_in("globex"),
            registration("dev@example.com", "dev", "Tr4verse!Quartz$Lamp"),
        )
        .await
        .unwrap();
    assert_eq!(other.tenant_id, "globex");
}

#[tokio::test]
async fn registration_validates_inputs() {
    let stack = TestStack::new();

    let bad_email = stack
        .directory
        .register_user(
            &stack.anon_ctx(),
            registration("not-an-email", "dev", "Tr4verse!Quartz$Lamp"),
        )
        .await
        .unwrap_err();
    assert_eq!(bad_email.kind, ErrorKind::Validation);
    assert_eq!(bad_email.message, "Invalid email format");

    let short_username = stack
        .directory
        .register_user(
            &stack.anon_ctx(),
            registration("dev@example.com", "ab", "Tr4verse!Quartz$Lamp"),
        )
        .await
        .unwrap_err();
    assert_eq!(short_username.message, "Username must be at least 3 characters");

    let weak_password = stack
        .directory
        .register_user(
            &stack.anon_ctx(),
            registration("dev@example.com", "dev", "Password1!"),
        )
        .await
        .unwrap_err();
    assert_eq!(weak_password.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn a_caller_cannot_deactivate_themselves() {
    let stack = TestStack::new();
    let admin = stack.seed_user("admin@example.com", "pw");

    let err = stack
        .directory
        .set_active(&stack.ctx_for(&admin), admin.id, false)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(err.message, "cannot self-deactivate");
    assert!(stack.audit.events().contains(&SecurityEvent::PolicyFailed {
        actor_id: Some(admin.id),
        target_id: Some(admin.id),
        code: PolicyCode::SelfDeactivation,
    }));
    assert!(stack.stores.user(admin.id).unwrap().active);
}

#[tokio::test]
async fn the_last_active_administrator_cannot_be_deactivated() {
    let stack = TestStack::new();
    let admin = stack.seed_user("admin@example.com", "pw");
    let other = stack.seed_user("other@example.com", "pw");
    stack.stores.assign_role(admin.id, ADMIN_ROLE).await.unwrap();

    let err = stack
        .directory
        .set_active(&stack.ctx_for(&other), admin.id, false)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(err.message, "cannot deactivate the last active administrator");
    assert!(stack.audit.events().contains(&SecurityEvent::PolicyFailed {
        actor_id: Some(other.id),
        target_id: Some(admin.id),
        code: PolicyCode::LastAdministrator,
    }));
}

#[tokio::test]
async fn deactivation_proceeds_with_remaining_admin_coverage() {
    let stack = TestStack::new();
    let admin = stack.seed_user("admin@example.com", "pw");
    let backup = stack.seed_user("backup@example.com", "pw");
    let other = stack.seed_user("other@example.com", "pw");
    stack.stores.assign_role(admin.id, ADMIN_ROLE).await.unwrap();
    stack.stores.assign_role(backup.id, ADMIN_ROLE).await.unwrap();

    let updated = stack
        .directory
        .set_active(&stack.ctx_for(&other), admin.id, false)
        .await
        .unwrap();
    assert!(!updated.active);
    assert!(stack
        .audit
        .activities()
        .iter()
        .any(|a| a.action == "user.deactivated"));

    // Reactivation has no guards.
    let restored = stack
        .directory
        .set_active(&stack.ctx_for(&other), admin.id, true)
        .await
        .unwrap();
    assert!(restored.active);
    assert!(stack
        .audit
        .activities()
        .iter()
        .any(|a| a.action == "user.activated"));
}

#[tokio::test]
async fn removing_the_last_admin_role_is_refused() {
    let stack = TestStack::new();
    let admin = stack.seed_user("admin@example.com", "pw");
    let caller = stack.seed_user("other@example.com", "pw");
    stack.stores.assign_role(admin.id, ADMIN_ROLE).await.unwrap();

    let err = stack
        .directory
        .remove_role(&stack.ctx_for(&caller), admin.id, ADMIN_ROLE)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(
        err.message,
        "cannot remove the administrator role from the last active administrator"
    );
    assert!(stack.audit.events().contains(&SecurityEvent::PolicyFailed {
        actor_id: Some(caller.id),
        target_id: Some(admin.id),
        code: PolicyCode::LastAdministrator,
    }));
}

#[tokio::test]
async fn an_inherited_admin_grant_exempts_direct_removal() {
    let stack = TestStack::new();
    let admin = stack.seed_user("admin@example.com", "pw");
    let caller = stack.seed_user("other@example.com", "pw");
    stack.stores.assign_role(admin.id, ADMIN_ROLE).await.unwrap();
    stack.stores.put_inherited_roles(admin.id, &[ADMIN_ROLE]);

    // The group grant keeps coverage, so the direct one may go.
    let removed = stack
        .directory
        .remove_role(&stack.ctx_for(&caller), admin.id, ADMIN_ROLE)
        .await
        .unwrap();
    assert!(removed);
    assert!(stack.stores.direct_roles(admin.id).await.unwrap().is_empty());

    // Removing a role the user does not hold reports false, no activity.
    let absent = stack
        .directory
        .remove_role(&stack.ctx_for(&caller), admin.id, "editor")
        .await
        .unwrap();
    assert!(!absent);
    let removals = stack
        .audit
        .activities()
        .iter()
        .filter(|a| a.action == "user.role_removed")
        .count();
    assert_eq!(removals, 1);
}

#[tokio::test]
async fn assign_role_invalidates_the_role_cache() {
    let stack = TestStack::new();
    let user = stack.seed_user("dev@example.com", "pw");
    let caller = stack.seed_user("admin@example.com", "pw");

    // Prime the cache with the empty role set.
    assert!(stack.resolver.resolve(user.id).await.unwrap().is_empty());

    let assigned = stack
        .directory
        .assign_role(&stack.ctx_for(&caller), user.id, "editor")
        .await
        .unwrap();
    assert!(assigned);
    assert_eq!(stack.resolver.resolve(user.id).await.unwrap(), vec!["editor"]);
    assert!(stack.audit.activities().iter().any(|a| {
        a.action == "user.role_assigned"
            && a.details == serde_json::json!({ "user_id": user.id, "role": "editor" })
    }));

    // Assigning an already-held role reports false and writes no activity.
    let again = stack
        .directory
        .assign_role(&stack.ctx_for(&caller), user.id, "editor")
        .await
        .unwrap();
    assert!(!again);
    let assignments = stack
        .audit
        .activities()
        .iter()
        .filter(|a| a.action == "user.role_assigned")
        .count();
    assert_eq!(assignments, 1);
}

#[tokio::test]
async fn change_password_rotates_hash_and_history() {
    let stack = TestStack::new();
    let user = stack.seed_user("dev@example.com", "Unrel4ted!Mango^Tide");
    let ctx = stack.ctx_for(&user);

    stack
        .directory
        .change_password(&ctx, user.id, "Unrel4ted!Mango^Tide", "Quixotic7!Marble^Dune")
        .await
        .unwrap();

    let stored = stack.stores.user(user.id).unwrap();
    assert_eq!(stored.password_hash, PlainHasher::hash_of("Quixotic7!Marble^Dune"));
    assert_eq!(stored.password_changed_at, ctx.request_time);
    assert_eq!(stack.stores.history_len(user.id), 1);
    assert!(stack.audit.events().contains(&SecurityEvent::PasswordChanged {
        user_id: user.id,
        changed_by: user.id,
    }));

    stack.login("dev@example.com", "Quixotic7!Marble^Dune").await;
}

#[tokio::test]
async fn change_password_requires_the_current_password() {
    let stack = TestStack::new();
    let user = stack.seed_user("dev@example.com", "pw");

    let err = stack
        .directory
        .change_password(&stack.ctx_for(&user), user.id, "not-the-password", "Quixotic7!Marble^Dune")
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert_eq!(err.message, "Current password is incorrect");
}

#[tokio::test]
async fn a_user_can_only_change_their_own_password() {
    let stack = TestStack::new();
    let alice = stack.seed_user("alice@example.com", "pw");
    let bob = stack.seed_user("bob@example.com", "pw");

    let err = stack
        .directory
        .change_password(&stack.ctx_for(&alice), bob.id, "pw", "Quixotic7!Marble^Dune")
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert_eq!(err.message, "you can only change your own password");
}

#[tokio::test]
async fn a_recently_used_password_is_rejected() {
    let stack = TestStack::new();
    let user = stack.seed_user("dev@example.com", "pw");
    let ctx = stack.ctx_for(&user);

    stack
        .directory
        .change_password(&ctx, user.id, "pw", "Vermilion9$Otter&Peak")
        .await
        .unwrap();

    let err = stack
        .directory
        .change_password(&ctx, user.id, "Vermilion9$Otter&Peak", "Vermilion9$Otter&Peak")
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.message, "Password must not match a recently used password");
    assert!(stack.audit.events().contains(&SecurityEvent::PolicyFailed {
        actor_id: Some(user.id),
        target_id: Some(user.id),
        code: PolicyCode::PasswordReuse,
    }));
}

#[tokio::test]
async fn password_history_window_bounds_the_reuse_check() {
    let stack = TestStack::with_config(
        SessionConfig::default(),
        PasswordPolicyConfig {
            history_count: 2,
            ..PasswordPolicyConfig::default()
        },
    );
    let user = stack.seed_user("dev@example.com", "pw");
    let ctx = stack.ctx_for(&user);

    let two = "Quixotic7!Marble^Dune";
    let three = "Vermilion9$Otter&Peak";
    let four = "Juniper4#Gale!Mossback";
    stack.directory.change_password(&ctx, user.id, "pw", two).await.unwrap();
    stack.directory.change_password(&ctx, user.id, two, three).await.unwrap();
    stack.directory.change_password(&ctx, user.id, three, four).await.unwrap();
    assert_eq!(stack.stores.history_len(user.id), 2);

    // The oldest entry has aged out of the window, so it is usable again.
    stack.directory.change_password(&ctx, user.id, four, two).await.unwrap();

    // The previous password is still within the window.
    let err = stack
        .directory
        .change_password(&ctx, user.id, two, four)
        .await
        .unwrap_err();
    assert_eq!(err.message, "Password must not match a recently used password");
}

#[tokio::test]
async fn reset_password_skips_the_current_password_check() {
    let stack = TestStack::new();
    let admin = stack.seed_user("admin@example.com", "pw");
    let user = stack.seed_user("dev@example.com", "pw");

    stack
        .directory
        .reset_password(&stack.ctx_for(&admin), user.id, "Sable2^Thicket!Reedling")
        .await
        .unwrap();

    assert!(stack.audit.events().contains(&SecurityEvent::PasswordChanged {
        user_id: user.id,
        changed_by: admin.id,
    }));

    stack.login("dev@example.com", "Sable2^Thicket!Reedling").await;
}

#[tokio::test]
async fn update_profile_applies_partial_changes() {
    let stack = TestStack::new();
    let user = stack.seed_user("dev@example.com", "pw");
    let ctx = stack.ctx_for(&user);

    let updated = stack
        .directory
        .update_profile(
            &ctx,
            user.id,
            &UpdateUserProfile {
                display_name: Some("Dana Dev".to_string()),
                phone: Some("555-0100".to_string()),
                image_url: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.display_name, "Dana Dev");
    assert_eq!(updated.phone.as_deref(), Some("555-0100"));

    // Omitted fields keep their values.
    let updated = stack
        .directory
        .update_profile(
            &ctx,
            user.id,
            &UpdateUserProfile {
                display_name: Some("D. Dev".to_string()),
                phone: None,
                image_url: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.display_name, "D. Dev");
    assert_eq!(updated.phone.as_deref(), Some("555-0100"));

    let err = stack
        .directory
        .update_profile(
            &ctx,
            user.id,
            &UpdateUserProfile {
                display_name: Some("   ".to_string()),
                phone: None,
                image_url: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.message, "Display name cannot be empty");

    let updates = stack
        .audit
        .activities()
        .iter()
        .filter(|a| a.action == "user.profile_updated")
        .count();
    assert_eq!(updates, 2);
}

#[tokio::test]
async fn list_users_paginates_newest_first() {
    let stack = TestStack::new();
    for (i, email) in ["a@example.com", "b@example.com", "c@example.com"]
        .iter()
        .enumerate()
    {
        let mut user = fixtures::user(TENANT, email, "x");
        user.created_at = Utc::now() - Duration::minutes(i as i64);
        stack.stores.put_user(user);
    }

    let page1 = stack
        .directory
        .list_users(&stack.anon_ctx(), &PageRequest::new(1, 2))
        .await
        .unwrap();
    assert_eq!(page1.items.len(), 2);
    assert_eq!(page1.total_items, 3);
    assert_eq!(page1.total_pages, 2);
    assert_eq!(page1.items[0].email, "a@example.com");
    assert_eq!(page1.items[1].email, "b@example.com");

    let page2 = stack
        .directory
        .list_users(&stack.anon_ctx(), &PageRequest::new(2, 2))
        .await
        .unwrap();
    assert_eq!(page2.items.len(), 1);
    assert_eq!(page2.items[0].email, "c@example.com");
}

#[tokio::test]
async fn get_user_is_tenant_scoped() {
    let stack = TestStack::new();
    stack.stores.put_tenant(fixtures::tenant("globex"));
    let foreign = stack.seed_user_in("globex", "dev@example.com", "pw");

    let missing = stack
        .directory
        .get_user(&stack.anon_ctx(), uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(missing.kind, ErrorKind::NotFound);

    // A user in another tenant is invisible, not merely forbidden.
    let cross = stack
        .directory
        .get_user(&stack.anon_ctx(), foreign.id)
        .await
        .unwrap_err();
    assert_eq!(cross.kind, ErrorKind::NotFound);
}
