//! MongoDB-backed identity and content stores
//!
//! Address uniqueness is enforced by the `address_unique` index, so a
//! registration race surfaces as [`StoreError::Conflict`] from the insert.

use async_trait::async_trait;
use bson::doc;
use chrono::Utc;

use super::mongo::{MongoClient, MongoCollection};
use super::schemas::{EntryDoc, IdentityDoc, Metadata, ENTRY_COLLECTION, IDENTITY_COLLECTION};
use crate::store::{ContentStore, Entry, Identity, IdentityStore, NewEntry, NewIdentity, StoreError};

pub struct MongoIdentityStore {
    collection: MongoCollection<IdentityDoc>,
}

impl MongoIdentityStore {
    pub async fn new(client: &MongoClient) -> Result<Self, StoreError> {
        Ok(Self {
            collection: client.collection(IDENTITY_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl IdentityStore for MongoIdentityStore {
    async fn find_by_address(&self, address: &str) -> Result<Option<Identity>, StoreError> {
        let found = self
            .collection
            .find_one(doc! { "address": address.to_lowercase() })
            .await?;
        Ok(found.map(IdentityDoc::into_identity))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError> {
        let found = self.collection.find_one(doc! { "identity_id": id }).await?;
        Ok(found.map(IdentityDoc::into_identity))
    }

    async fn create(&self, input: NewIdentity) -> Result<Identity, StoreError> {
        // Millisecond precision so the returned value matches what is stored
        let now = bson::DateTime::from_chrono(Utc::now());
        let doc = IdentityDoc {
            _id: None,
            metadata: Metadata::created(now),
            identity_id: uuid::Uuid::new_v4().to_string(),
            name: input.name,
            address: input.address.to_lowercase(),
            password_hash: input.password_hash,
        };

        self.collection.insert_one(doc.clone()).await?;
        Ok(doc.into_identity())
    }
}

pub struct MongoContentStore {
    collection: MongoCollection<EntryDoc>,
}

impl MongoContentStore {
    pub async fn new(client: &MongoClient) -> Result<Self, StoreError> {
        Ok(Self {
            collection: client.collection(ENTRY_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl ContentStore for MongoContentStore {
    async fn create(&self, input: NewEntry) -> Result<Entry, StoreError> {
        let now = bson::DateTime::from_chrono(Utc::now());
        let doc = EntryDoc {
            _id: None,
            metadata: Metadata::created(now),
            entry_id: uuid::Uuid::new_v4().to_string(),
            title: input.title,
            body: input.body,
            author_id: input.author_id,
            author_name: input.author_name,
            published: input.published,
        };

        self.collection.insert_one(doc.clone()).await?;
        Ok(doc.into_entry())
    }

    async fn list_published(&self) -> Result<Vec<Entry>, StoreError> {
        let docs = self
            .collection
            .find_sorted(
                doc! { "published": true },
                doc! { "metadata.created_at": -1, "_id": -1 },
            )
            .await?;
        Ok(docs.into_iter().map(EntryDoc::into_entry).collect())
    }
}
