//! Shared types for Herald

mod error;

pub use error::{ErrorKind, HeraldError};

/// Result alias used across Herald
pub type Result<T> = std::result::Result<T, HeraldError>;
