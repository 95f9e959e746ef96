//! Anti-automation challenge gate
//!
//! Registration must present a human-presence token, which is checked
//! against an external verification endpoint (Cloudflare Turnstile by
//! default). The gate fails closed: a missing token, timeout, non-2xx
//! status or unparseable body all count as a failed challenge.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::HeraldError;

/// Default verification endpoint
pub const TURNSTILE_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

#[async_trait]
pub trait ChallengeGate: Send + Sync {
    /// Returns true only if the verification service accepted the token
    async fn verify(&self, presented_token: Option<&str>, client_address: Option<&str>) -> bool;
}

/// Configuration for the Turnstile gate
#[derive(Debug, Clone)]
pub struct ChallengeConfig {
    pub secret: String,
    pub verify_url: String,
    pub timeout: Duration,
}

impl ChallengeConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            verify_url: TURNSTILE_VERIFY_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    secret: &'a str,
    response: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    remoteip: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
    #[serde(default)]
    hostname: Option<String>,
}

/// Gate backed by a Turnstile-compatible siteverify endpoint
pub struct TurnstileGate {
    config: ChallengeConfig,
    http_client: reqwest::Client,
}

impl TurnstileGate {
    /// Build the gate and its HTTP client
    ///
    /// Fails if the client cannot be constructed, so the timeout is never
    /// silently lost.
    pub fn new(config: ChallengeConfig) -> Result<Self, HeraldError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent("herald/1.0")
            .build()
            .map_err(|e| HeraldError::Config(format!("Failed to build challenge client: {}", e)))?;

        Ok(Self::with_client(config, http_client))
    }

    fn with_client(config: ChallengeConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// One round-trip to the verification endpoint, bounded by the
    /// configured timeout regardless of how the client was built
    async fn siteverify(&self, token: &str, client_address: Option<&str>) -> Result<VerifyResponse, HeraldError> {
        let request = VerifyRequest {
            secret: &self.config.secret,
            response: token,
            remoteip: client_address,
        };

        let call = async {
            self.http_client
                .post(&self.config.verify_url)
                .json(&request)
                .send()
                .await?
                .error_for_status()?
                .json::<VerifyResponse>()
                .await
        };

        match tokio::time::timeout(self.config.timeout, call).await {
            Ok(result) => result.map_err(HeraldError::from),
            Err(_) => Err(HeraldError::Transport(format!(
                "no answer within {}ms",
                self.config.timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl ChallengeGate for TurnstileGate {
    async fn verify(&self, presented_token: Option<&str>, client_address: Option<&str>) -> bool {
        let Some(token) = presented_token.filter(|t| !t.is_empty()) else {
            debug!("Challenge rejected: no token presented");
            return false;
        };

        match self.siteverify(token, client_address).await {
            Ok(response) => {
                if !response.success {
                    debug!(
                        error_codes = ?response.error_codes,
                        hostname = ?response.hostname,
                        "Challenge rejected by verification service"
                    );
                }
                response.success
            }
            Err(e) => {
                warn!(error = %e, kind = %e.kind(), "Challenge verification unavailable, failing closed");
                false
            }
        }
    }
}

/// Gate with a fixed answer
///
/// Used in development mode when no challenge secret is configured.
#[derive(Debug, Clone, Copy)]
pub struct StaticGate {
    pass: bool,
}

impl StaticGate {
    pub fn allow_all() -> Self {
        Self { pass: true }
    }

    pub fn deny_all() -> Self {
        Self { pass: false }
    }
}

#[async_trait]
impl ChallengeGate for StaticGate {
    async fn verify(&self, _presented_token: Option<&str>, _client_address: Option<&str>) -> bool {
        self.pass
    }
}
