//! Configuration for Herald
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{DEFAULT_TOKEN_TTL_SECS, MAX_TOKEN_TTL_SECS};
use crate::services::TURNSTILE_VERIFY_URL;

/// Herald - authenticated posting gateway with a live WebSocket feed
#[derive(Parser, Debug, Clone)]
#[command(name = "herald")]
#[command(about = "Authenticated posting gateway with real-time WebSocket fan-out")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Enable development mode (insecure token secret, challenge bypass,
    /// in-memory stores when MongoDB is unavailable)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value_t = DEFAULT_TOKEN_TTL_SECS)]
    pub jwt_expiry_seconds: u64,

    /// Secret for the challenge verification service (required in production)
    #[arg(long, env = "CHALLENGE_SECRET")]
    pub challenge_secret: Option<String>,

    /// Challenge verification endpoint
    #[arg(long, env = "CHALLENGE_URL", default_value = TURNSTILE_VERIFY_URL)]
    pub challenge_url: String,

    /// Challenge verification timeout in milliseconds
    #[arg(long, env = "CHALLENGE_TIMEOUT_MS", default_value = "10000")]
    pub challenge_timeout_ms: u64,

    /// MongoDB connection URI (in-memory stores when unset)
    #[arg(long, env = "MONGODB_URI")]
    pub mongodb_uri: Option<String>,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "herald")]
    pub mongodb_db: String,

    /// Per-observer event queue capacity; observers that fall this far
    /// behind are disconnected
    #[arg(long, env = "FEED_BUFFER", default_value = "64")]
    pub feed_buffer: usize,

    /// Path of the JSONL activity log (disabled when unset)
    #[arg(long, env = "ACTIVITY_LOG")]
    pub activity_log: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn challenge_timeout(&self) -> Duration {
        Duration::from_millis(self.challenge_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match self.jwt_secret.as_deref() {
                None | Some("") => {
                    return Err("JWT_SECRET is required in production mode".to_string())
                }
                Some(secret) if secret.len() < 32 => {
                    return Err("JWT_SECRET must be at least 32 characters".to_string())
                }
                Some(_) => {}
            }

            if self.challenge_secret.as_deref().unwrap_or("").is_empty() {
                return Err("CHALLENGE_SECRET is required in production mode".to_string());
            }
        }

        if self.feed_buffer == 0 {
            return Err("FEED_BUFFER must be at least 1".to_string());
        }

        if self.jwt_expiry_seconds == 0 || self.jwt_expiry_seconds > MAX_TOKEN_TTL_SECS {
            return Err(format!(
                "JWT_EXPIRY_SECONDS must be between 1 and {}",
                MAX_TOKEN_TTL_SECS
            ));
        }

        Ok(())
    }
}
