//! MongoDB client and collection wrapper

use bson::{doc, oid::ObjectId, Document};
use futures::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::db::schemas::Metadata;
use crate::store::StoreError;
use crate::types::HeraldError;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping, failing fast when the server is unreachable
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, HeraldError> {
        info!("Connecting to MongoDB database '{}'", db_name);

        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| HeraldError::Storage(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| HeraldError::Storage(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection with its indexes applied
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, StoreError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self, StoreError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    async fn apply_indexes(&self) -> Result<(), StoreError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document. A unique index violation is a [`StoreError::Conflict`].
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, StoreError> {
        let metadata = item.mut_metadata();
        if metadata.created_at.is_none() {
            *metadata = Metadata::created(bson::DateTime::now());
        }

        let result = self.inner.insert_one(item).await.map_err(|e| {
            match *e.kind {
                ErrorKind::Write(WriteFailure::WriteError(ref write_error))
                    if write_error.code == DUPLICATE_KEY_CODE =>
                {
                    StoreError::Conflict(write_error.message.clone())
                }
                _ => StoreError::Backend(format!("Insert failed: {}", e)),
            }
        })?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StoreError::Backend("Failed to get inserted ID".into()))
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, StoreError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| StoreError::Backend(format!("Find failed: {}", e)))
    }

    /// Find all documents matching `filter`, ordered by `sort`
    pub async fn find_sorted(&self, filter: Document, sort: Document) -> Result<Vec<T>, StoreError> {
        let cursor = self
            .inner
            .find(filter)
            .sort(sort)
            .await
            .map_err(|e| StoreError::Backend(format!("Find failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| StoreError::Backend(format!("Cursor failed: {}", e)))
    }
}
