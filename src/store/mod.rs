//! Persistence collaborators
//!
//! Herald reaches its data through two traits:
//! - [`IdentityStore`] - accounts keyed by a unique, case-insensitive address
//! - [`ContentStore`] - published entries
//!
//! Both are externally synchronized; callers just await the result.
//! In-memory implementations live in [`memory`], MongoDB-backed ones in
//! [`crate::db`].

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use memory::{MemoryContentStore, MemoryIdentityStore};

/// Errors reported by store implementations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique constraint violated (address already taken)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Anything else the backend reports
    #[error("backend failure: {0}")]
    Backend(String),
}

/// A registered account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub name: String,
    /// Normalized (trimmed, lowercase) address
    pub address: String,
    /// PHC-formatted password hash
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// Public projection without the password hash
    pub fn view(&self) -> IdentityView {
        IdentityView {
            id: self.id.clone(),
            name: self.name.clone(),
            address: self.address.clone(),
        }
    }
}

/// Public projection of an [`Identity`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityView {
    pub id: String,
    pub name: String,
    #[serde(rename = "email")]
    pub address: String,
}

/// Input for [`IdentityStore::create`]
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub name: String,
    pub address: String,
    pub password_hash: String,
}

/// A published content entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub title: String,
    #[serde(rename = "content")]
    pub body: String,
    pub author_id: String,
    pub author: EntryAuthor,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

/// Author details shown with an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryAuthor {
    pub name: String,
}

/// Input for [`ContentStore::create`]
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub title: String,
    pub body: String,
    pub author_id: String,
    /// Display name of the author at creation time
    pub author_name: String,
    pub published: bool,
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up an identity by its normalized address
    async fn find_by_address(&self, address: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError>;

    /// Create an identity; fails with [`StoreError::Conflict`] if the
    /// address is taken, atomically with respect to concurrent creates.
    async fn create(&self, input: NewIdentity) -> Result<Identity, StoreError>;
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn create(&self, input: NewEntry) -> Result<Entry, StoreError>;

    /// Published entries, newest first
    async fn list_published(&self) -> Result<Vec<Entry>, StoreError>;
}
