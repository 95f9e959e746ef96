//! Registration and login
//!
//! Flow for registration:
//! 1. Challenge gate must pass
//! 2. Validate required fields
//! 3. Check the address is not already registered
//! 4. Hash password with argon2
//! 5. Store the identity and return its public projection
//!
//! Login looks the identity up and verifies the password; an unknown address
//! and a wrong password produce the same rejection.

use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, TokenService};
use crate::logging::ActivityLogger;
use crate::services::challenge::ChallengeGate;
use crate::store::{IdentityStore, IdentityView, NewIdentity, StoreError};
use crate::types::{HeraldError, Result};

/// Everything registration needs from the request
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub challenge_token: Option<String>,
    pub client_address: Option<String>,
    pub name: String,
    pub address: String,
    pub password: String,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub expires_at: u64,
    pub identity: IdentityView,
}

pub struct AuthGateway {
    identities: Arc<dyn IdentityStore>,
    tokens: Arc<TokenService>,
    challenge: Arc<dyn ChallengeGate>,
    activity: ActivityLogger,
}

impl AuthGateway {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        tokens: Arc<TokenService>,
        challenge: Arc<dyn ChallengeGate>,
        activity: ActivityLogger,
    ) -> Self {
        Self {
            identities,
            tokens,
            challenge,
            activity,
        }
    }

    pub async fn register(&self, input: RegisterInput) -> Result<IdentityView> {
        let passed = self
            .challenge
            .verify(input.challenge_token.as_deref(), input.client_address.as_deref())
            .await;
        if !passed {
            warn!(client = ?input.client_address, "Registration rejected: challenge failed");
            return Err(HeraldError::ChallengeFailed);
        }

        let name = input.name.trim();
        let address = normalize_address(&input.address);
        if name.is_empty() || address.is_empty() || input.password.is_empty() {
            return Err(HeraldError::InvalidInput(
                "Missing required fields: name, email, password".into(),
            ));
        }

        if self.identities.find_by_address(&address).await?.is_some() {
            info!("Registration rejected: address already registered");
            return Err(HeraldError::DuplicateIdentity);
        }

        let password = input.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| HeraldError::Internal(format!("Hashing task failed: {}", e)))??;

        let identity = self
            .identities
            .create(NewIdentity {
                name: name.to_string(),
                address,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration of the same address
                StoreError::Conflict(_) => HeraldError::DuplicateIdentity,
                other => HeraldError::from(other),
            })?;

        info!(identity = %identity.id, "Identity registered");
        self.activity.log_registration(&identity.id).await;

        Ok(identity.view())
    }

    pub async fn login(&self, address: &str, password: &str) -> Result<LoginOutcome> {
        let address = normalize_address(address);
        if address.is_empty() || password.is_empty() {
            return Err(HeraldError::InvalidInput(
                "Email and password required".into(),
            ));
        }

        let Some(identity) = self.identities.find_by_address(&address).await? else {
            warn!("Login failed: unknown address");
            self.activity.log_login_attempt(false, None).await;
            return Err(HeraldError::InvalidCredentials);
        };

        let candidate = password.to_string();
        let stored = identity.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&candidate, &stored))
            .await
            .map_err(|e| HeraldError::Internal(format!("Verification task failed: {}", e)))?;

        if !valid {
            warn!(identity = %identity.id, "Login failed: wrong password");
            self.activity.log_login_attempt(false, Some(&identity.id)).await;
            return Err(HeraldError::InvalidCredentials);
        }

        let issued = self.tokens.issue(&identity.id)?;
        info!(identity = %identity.id, "Login successful");
        self.activity.log_login_attempt(true, Some(&identity.id)).await;

        Ok(LoginOutcome {
            token: issued.token,
            expires_at: issued.expires_at,
            identity: identity.view(),
        })
    }
}

/// Addresses are unique case-insensitively
fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::challenge::StaticGate;
    use crate::store::{Identity, MemoryIdentityStore};
    use async_trait::async_trait;
    use tokio_test::{assert_err, assert_ok};

    fn gateway(store: Arc<MemoryIdentityStore>, gate: StaticGate) -> AuthGateway {
        AuthGateway::new(
            store,
            Arc::new(TokenService::new_dev()),
            Arc::new(gate),
            ActivityLogger::disabled(),
        )
    }

    fn ada() -> RegisterInput {
        RegisterInput {
            challenge_token: Some("token".into()),
            client_address: Some("203.0.113.7".into()),
            name: "Ada".into(),
            address: "ada@x.io".into(),
            password: "pw123".into(),
        }
    }

    #[tokio::test]
    async fn test_register_returns_projection() {
        let store = Arc::new(MemoryIdentityStore::new());
        let gateway = gateway(store.clone(), StaticGate::allow_all());

        let view = assert_ok!(gateway.register(ada()).await);
        assert_eq!(view.name, "Ada");
        assert_eq!(view.address, "ada@x.io");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_challenge_creates_nothing() {
        let store = Arc::new(MemoryIdentityStore::new());
        let gateway = gateway(store.clone(), StaticGate::deny_all());

        let err = assert_err!(gateway.register(ada()).await);
        assert!(matches!(err, HeraldError::ChallengeFailed));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_challenge_checked_before_fields() {
        let gateway = gateway(Arc::new(MemoryIdentityStore::new()), StaticGate::deny_all());
        let err = assert_err!(gateway.register(RegisterInput::default()).await);
        assert!(matches!(err, HeraldError::ChallengeFailed));
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let gateway = gateway(Arc::new(MemoryIdentityStore::new()), StaticGate::allow_all());

        for input in [
            RegisterInput { name: "  ".into(), ..ada() },
            RegisterInput { address: String::new(), ..ada() },
            RegisterInput { password: String::new(), ..ada() },
        ] {
            let err = assert_err!(gateway.register(input).await);
            assert!(matches!(err, HeraldError::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn test_duplicate_address_any_case() {
        let store = Arc::new(MemoryIdentityStore::new());
        let gateway = gateway(store.clone(), StaticGate::allow_all());

        assert_ok!(gateway.register(ada()).await);
        let err = assert_err!(
            gateway
                .register(RegisterInput {
                    address: " ADA@X.io ".into(),
                    ..ada()
                })
                .await
        );
        assert!(matches!(err, HeraldError::DuplicateIdentity));
        assert_eq!(store.len().await, 1);
    }

    /// Store whose lookup misses but whose create reports a conflict,
    /// as happens when two registrations race.
    struct RacingStore;

    #[async_trait]
    impl IdentityStore for RacingStore {
        async fn find_by_address(&self, _address: &str) -> std::result::Result<Option<Identity>, StoreError> {
            Ok(None)
        }

        async fn find_by_id(&self, _id: &str) -> std::result::Result<Option<Identity>, StoreError> {
            Ok(None)
        }

        async fn create(&self, input: NewIdentity) -> std::result::Result<Identity, StoreError> {
            Err(StoreError::Conflict(input.address))
        }
    }

    #[tokio::test]
    async fn test_create_conflict_maps_to_duplicate() {
        let gateway = AuthGateway::new(
            Arc::new(RacingStore),
            Arc::new(TokenService::new_dev()),
            Arc::new(StaticGate::allow_all()),
            ActivityLogger::disabled(),
        );

        let err = assert_err!(gateway.register(ada()).await);
        assert!(matches!(err, HeraldError::DuplicateIdentity));
    }

    #[tokio::test]
    async fn test_login_issues_token_for_identity() {
        let gateway = gateway(Arc::new(MemoryIdentityStore::new()), StaticGate::allow_all());
        let view = gateway.register(ada()).await.unwrap();

        let outcome = assert_ok!(gateway.login("Ada@x.io", "pw123").await);
        assert_eq!(outcome.identity, view);
        assert_eq!(
            TokenService::new_dev().verify(&outcome.token),
            Some(view.id)
        );
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let gateway = gateway(Arc::new(MemoryIdentityStore::new()), StaticGate::allow_all());
        gateway.register(ada()).await.unwrap();

        let wrong_password = assert_err!(gateway.login("ada@x.io", "nope").await);
        let unknown = assert_err!(gateway.login("bob@x.io", "pw123").await);

        assert_eq!(wrong_password.kind(), unknown.kind());
        assert_eq!(wrong_password.public_message(), unknown.public_message());
        assert!(matches!(unknown, HeraldError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_requires_fields() {
        let gateway = gateway(Arc::new(MemoryIdentityStore::new()), StaticGate::allow_all());
        let err = assert_err!(gateway.login("", "pw").await);
        assert!(matches!(err, HeraldError::InvalidInput(_)));
    }
}
