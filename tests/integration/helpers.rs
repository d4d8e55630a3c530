//! Shared test helpers for integration tests.

use std::sync::Arc;

use identhub_auth::credentials::CredentialValidator;
use identhub_auth::password::{PasswordPolicy, PasswordStrength};
use identhub_auth::roles::RoleResolver;
use identhub_auth::session::SessionRegistry;
use identhub_auth::token::{JwtSigner, TokenIssuer, TokenRotator};
use identhub_core::config::{CacheConfig, PasswordPolicyConfig, SessionConfig, TokenConfig};
use identhub_core::context::RequestContext;
use identhub_entity::user::User;
use identhub_service::{AuthService, LoginOutcome, SessionService, UserDirectory};
use identhub_test_support::fixtures;
use identhub_test_support::{MemoryStores, PlainHasher, RecordingAuditSink};

/// The tenant every stack starts out with.
pub const TENANT: &str = "acme";

/// User agent used for seeded contexts.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0";

/// The full identity stack wired over shared in-memory stores.
pub struct TestStack {
    /// Backing stores, exposed for seeding and direct assertions.
    pub stores: Arc<MemoryStores>,
    /// Recording audit sink.
    pub audit: Arc<RecordingAuditSink>,
    /// The signer, for minting tokens outside the normal flows.
    pub signer: Arc<JwtSigner>,
    /// Role resolution cache.
    pub resolver: Arc<RoleResolver>,
    /// Refresh rotation.
    pub rotator: TokenRotator,
    /// Login/logout flows.
    pub auth: AuthService,
    /// User directory.
    pub directory: UserDirectory,
    /// Session management surface.
    pub sessions: SessionService,
}

impl TestStack {
    /// A stack with default session and password-policy settings.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default(), PasswordPolicyConfig::default())
    }

    /// A stack with explicit session and password-policy settings.
    pub fn with_config(session_config: SessionConfig, policy_config: PasswordPolicyConfig) -> Self {
        let stores = Arc::new(MemoryStores::new());
        stores.put_tenant(fixtures::tenant(TENANT));

        let audit = Arc::new(RecordingAuditSink::new());
        let hasher = Arc::new(PlainHasher);

        let signer = Arc::new(JwtSigner::new(&TokenConfig {
            secret: "integration-suite-signing-secret".to_string(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 7,
        }));

        let resolver = Arc::new(RoleResolver::new(
            stores.clone(),
            &CacheConfig::default(),
        ));

        let validator = Arc::new(CredentialValidator::new(
            stores.clone(),
            stores.clone(),
            Arc::clone(&resolver),
            hasher.clone(),
            audit.clone(),
        ));

        let issuer = Arc::new(TokenIssuer::new(signer.clone()));

        let registry = Arc::new(SessionRegistry::new(
            stores.clone(),
            audit.clone(),
            session_config,
        ));

        let policy = Arc::new(PasswordPolicy::new(
            policy_config.clone(),
            stores.clone(),
            hasher.clone(),
        ));
        let strength = PasswordStrength::new(&policy_config);

        let rotator = TokenRotator::new(
            Arc::clone(&validator),
            Arc::clone(&issuer),
            Arc::clone(&registry),
            stores.clone(),
            signer.clone(),
            audit.clone(),
        );

        let auth = AuthService::new(
            Arc::clone(&validator),
            Arc::clone(&issuer),
            Arc::clone(&registry),
            stores.clone(),
            stores.clone(),
            Arc::clone(&policy),
            audit.clone(),
        );

        let directory = UserDirectory::new(
            stores.clone(),
            stores.clone(),
            Arc::clone(&resolver),
            hasher.clone(),
            strength,
            Arc::clone(&policy),
            audit.clone(),
        );

        let sessions = SessionService::new(
            stores.clone(),
            audit.clone(),
        );

        Self {
            stores,
            audit,
            signer,
            resolver,
            rotator,
            auth,
            directory,
            sessions,
        }
    }

    /// Seeds an active, confirmed user in the default tenant.
    pub fn seed_user(&self, email: &str, password: &str) -> User {
        self.seed_user_in(TENANT, email, password)
    }

    /// Seeds an active, confirmed user in the given tenant.
    pub fn seed_user_in(&self, tenant_id: &str, email: &str, password: &str) -> User {
        let user = fixtures::user(tenant_id, email, &PlainHasher::hash_of(password));
        self.stores.put_user(user.clone());
        user
    }

    /// Anonymous context in the default tenant (login, refresh).
    pub fn anon_ctx(&self) -> RequestContext {
        self.anon_ctx_in(TENANT)
    }

    /// Anonymous context in the given tenant.
    pub fn anon_ctx_in(&self, tenant_id: &str) -> RequestContext {
        RequestContext::anonymous(
            tenant_id,
            Some("198.51.100.23".to_string()),
            Some(USER_AGENT.to_string()),
        )
    }

    /// Authenticated context for a user, in the user's own tenant.
    pub fn ctx_for(&self, user: &User) -> RequestContext {
        RequestContext::authenticated(
            user.tenant_id.clone(),
            user.id,
            Some("198.51.100.23".to_string()),
            Some(USER_AGENT.to_string()),
        )
    }

    /// Logs a seeded user in under the default tenant, asserting success.
    pub async fn login(&self, email: &str, password: &str) -> LoginOutcome {
        self.auth
            .login(&self.anon_ctx(), email, password)
            .await
            .expect("login should succeed")
    }
}
