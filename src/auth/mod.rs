//! Authentication primitives for Herald
//!
//! Provides:
//! - Password hashing with Argon2
//! - Bearer token issuance and verification (HS256 JWT)
//! - An injectable clock for expiry checks

pub mod clock;
pub mod jwt;
pub mod password;

pub use clock::{Clock, ManualClock, SystemClock};
pub use jwt::{
    extract_token_from_header, Claims, IssuedToken, TokenService, DEFAULT_TOKEN_TTL_SECS,
    MAX_TOKEN_TTL_SECS,
};
pub use password::{hash_password, verify_password};
