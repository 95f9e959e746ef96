//! In-memory store implementations
//!
//! Used in development mode when no MongoDB is configured, and by tests.
//! Data lives only as long as the process.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{ContentStore, Entry, EntryAuthor, Identity, IdentityStore, NewEntry, NewIdentity, StoreError};

/// Identities keyed by lowercase address
#[derive(Default)]
pub struct MemoryIdentityStore {
    identities: RwLock<HashMap<String, Identity>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored identities
    pub async fn len(&self) -> usize {
        self.identities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.identities.read().await.is_empty()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_address(&self, address: &str) -> Result<Option<Identity>, StoreError> {
        let key = address.to_lowercase();
        Ok(self.identities.read().await.get(&key).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self
            .identities
            .read()
            .await
            .values()
            .find(|identity| identity.id == id)
            .cloned())
    }

    async fn create(&self, input: NewIdentity) -> Result<Identity, StoreError> {
        let key = input.address.to_lowercase();
        let mut identities = self.identities.write().await;

        if identities.contains_key(&key) {
            return Err(StoreError::Conflict(format!("address {} already registered", key)));
        }

        let identity = Identity {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name,
            address: key.clone(),
            password_hash: input.password_hash,
            created_at: Utc::now(),
        };
        identities.insert(key, identity.clone());

        Ok(identity)
    }
}

/// Entries in insertion order
#[derive(Default)]
pub struct MemoryContentStore {
    entries: RwLock<Vec<Entry>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn create(&self, input: NewEntry) -> Result<Entry, StoreError> {
        let entry = Entry {
            id: uuid::Uuid::new_v4().to_string(),
            title: input.title,
            body: input.body,
            author_id: input.author_id,
            author: EntryAuthor {
                name: input.author_name,
            },
            published: input.published,
            created_at: Utc::now(),
        };

        self.entries.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn list_published(&self) -> Result<Vec<Entry>, StoreError> {
        // Insertion order is commit order, so reversing gives newest first
        // even when two entries share a timestamp.
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .rev()
            .filter(|e| e.published)
            .cloned()
            .collect())
    }
}
