//! Password hashing and verification using Argon2
//!
//! Uses the argon2id variant with the crate's default parameters
//! (19 MiB memory, 2 passes). The PHC output embeds algorithm, parameters
//! and salt, so verification needs nothing but the stored string.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::warn;

use crate::types::HeraldError;

/// Hash a password using Argon2id with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, HeraldError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HeraldError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash
///
/// A malformed hash never raises; it is a rejected credential.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored password hash is malformed: {e}");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
