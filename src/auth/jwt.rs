//! Bearer token handling
//!
//! Tokens are HS256 JWTs carrying `{sub, iat, exp}`, signed with the
//! process-wide secret loaded at startup. A token is valid iff its signature
//! verifies and the clock is strictly before `exp`.
//!
//! There is no revocation list: once issued, a token stays valid for its
//! whole lifetime.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use crate::types::HeraldError;

/// Default token lifetime: 24 hours
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// Longest accepted token lifetime: 365 days
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

const MIN_SECRET_LEN: usize = 32;

/// Payload stored in the token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// A freshly issued token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: u64,
}

/// Issues and verifies bearer tokens
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// Create a token service
    ///
    /// Returns an error if the secret is empty or too short, or the lifetime
    /// is zero or above [`MAX_TOKEN_TTL_SECS`]
    pub fn new(secret: &str, ttl_secs: u64, clock: Arc<dyn Clock>) -> Result<Self, HeraldError> {
        if secret.is_empty() {
            return Err(HeraldError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < MIN_SECRET_LEN {
            return Err(HeraldError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        if ttl_secs == 0 || ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(HeraldError::Config(format!(
                "JWT_EXPIRY_SECONDS must be between 1 and {}",
                MAX_TOKEN_TTL_SECS
            )));
        }

        Ok(Self::from_secret(secret, ttl_secs, clock))
    }

    /// Create a service for dev mode with a fixed, insecure secret
    pub fn new_dev() -> Self {
        Self::from_secret(
            "dev-mode-secret-not-for-production-use-123456",
            DEFAULT_TOKEN_TTL_SECS,
            Arc::new(SystemClock),
        )
    }

    fn from_secret(secret: &str, ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
            clock,
        }
    }

    /// Issue a token bound to an identity id
    pub fn issue(&self, identity_id: &str) -> Result<IssuedToken, HeraldError> {
        let now = self.clock.now();
        let exp = now
            .checked_add(self.ttl_secs)
            .ok_or_else(|| HeraldError::Internal("Token expiry overflows the clock".into()))?;
        let claims = Claims {
            sub: identity_id.to_string(),
            iat: now,
            exp,
        };

        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| HeraldError::Internal(format!("Failed to generate token: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Verify a token and return the identity id it is bound to
    ///
    /// Malformed, tampered and expired tokens all yield `None`.
    pub fn verify(&self, token: &str) -> Option<String> {
        self.verify_claims(token).map(|claims| claims.sub)
    }

    /// Verify a token and return its full claims
    pub fn verify_claims(&self, token: &str) -> Option<Claims> {
        // Expiry is checked against our own clock below
        let mut validation = Validation::default();
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => data.claims,
            Err(err) => {
                debug!(reason = ?err.kind(), "Token rejected");
                return None;
            }
        };

        if self.clock.now() >= claims.exp {
            debug!(sub = %claims.sub, exp = claims.exp, "Token rejected: expired");
            return None;
        }

        Some(claims)
    }
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format (scheme matched case-insensitively) and
/// raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some((scheme, rest)) = header.split_once(' ') {
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = rest.trim();
        if !token.is_empty() {
            return Some(token);
        }
        return None;
    }

    let token = header.trim();
    if !token.is_empty() {
        return Some(token);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;

    const SECRET: &str = "test-secret-that-is-at-least-32-characters-long";

    fn service_with_clock(start: u64) -> (TokenService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        let service = TokenService::new(SECRET, DEFAULT_TOKEN_TTL_SECS, clock.clone()).unwrap();
        (service, clock)
    }

    #[test]
    fn test_issue_and_verify() {
        let (service, _) = service_with_clock(1_700_000_000);

        let issued = service.issue("identity-123").unwrap();
        assert_eq!(issued.expires_at, 1_700_000_000 + DEFAULT_TOKEN_TTL_SECS);
        assert_eq!(service.verify(&issued.token), Some("identity-123".to_string()));

        let claims = service.verify_claims(&issued.token).unwrap();
        assert_eq!(claims.iat, 1_700_000_000);
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let (service, clock) = service_with_clock(1_700_000_000);
        let issued = service.issue("identity-123").unwrap();

        clock.advance(DEFAULT_TOKEN_TTL_SECS - 1);
        assert!(service.verify(&issued.token).is_some());

        // Valid only while now < exp
        clock.set(issued.expires_at);
        assert!(service.verify(&issued.token).is_none());

        clock.advance(3600);
        assert!(service.verify(&issued.token).is_none());
    }

    #[test]
    fn test_wrong_secret() {
        let (service, _) = service_with_clock(1_700_000_000);
        let other = TokenService::new(
            "different-secret-that-is-at-least-32-characters",
            DEFAULT_TOKEN_TTL_SECS,
            Arc::new(ManualClock::new(1_700_000_000)),
        )
        .unwrap();

        let issued = service.issue("identity-123").unwrap();
        assert!(other.verify(&issued.token).is_none());
    }

    #[test]
    fn test_malformed_and_tampered() {
        let (service, _) = service_with_clock(1_700_000_000);
        assert!(service.verify("invalid-token").is_none());
        assert!(service.verify("").is_none());

        // Payload of one token under the signature of another
        let victim = service.issue("identity-123").unwrap();
        let attacker = service.issue("identity-999").unwrap();
        let victim_parts: Vec<&str> = victim.token.split('.').collect();
        let attacker_parts: Vec<&str> = attacker.token.split('.').collect();

        let tampered = format!("{}.{}.{}", victim_parts[0], attacker_parts[1], victim_parts[2]);
        assert!(service.verify(&tampered).is_none());
    }

    #[test]
    fn test_token_is_url_safe() {
        let (service, _) = service_with_clock(1_700_000_000);
        let issued = service.issue("identity-123").unwrap();
        assert!(issued
            .token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'));
    }

    #[test]
    fn test_secret_validation() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        assert!(TokenService::new("short", 3600, clock.clone()).is_err());
        assert!(TokenService::new("", 3600, clock.clone()).is_err());
        assert!(TokenService::new("this-secret-is-at-least-32-chars-long", 3600, clock).is_ok());
    }

    #[test]
    fn test_lifetime_bounds() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(1_700_000_000));
        assert!(TokenService::new(SECRET, 0, clock.clone()).is_err());
        assert!(TokenService::new(SECRET, u64::MAX, clock.clone()).is_err());
        assert!(TokenService::new(SECRET, MAX_TOKEN_TTL_SECS + 1, clock.clone()).is_err());

        let service = TokenService::new(SECRET, MAX_TOKEN_TTL_SECS, clock).unwrap();
        let issued = service.issue("identity-123").unwrap();
        assert_eq!(issued.expires_at, 1_700_000_000 + MAX_TOKEN_TTL_SECS);
        assert!(service.verify(&issued.token).is_some());
    }

    #[test]
    fn test_issue_near_clock_limit_errors_instead_of_wrapping() {
        let (service, _) = service_with_clock(u64::MAX - 10);
        let err = service.issue("identity-123").unwrap_err();
        assert!(matches!(err, HeraldError::Internal(_)));
    }

    #[test]
    fn test_dev_mode_service() {
        let service = TokenService::new_dev();
        let issued = service.issue("identity-123").unwrap();
        assert!(service.verify(&issued.token).is_some());
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(extract_token_from_header(Some("Bearer abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(Some("bearer abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(Some("BEARER abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(Some("abc123")), Some("abc123"));

        assert_eq!(extract_token_from_header(None), None);
        assert_eq!(extract_token_from_header(Some("")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
    }
}
