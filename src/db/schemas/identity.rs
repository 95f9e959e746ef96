//! Identity document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::store::Identity;

/// Collection name for identities
pub const IDENTITY_COLLECTION: &str = "identities";

/// Identity document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct IdentityDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Opaque identity id handed out in tokens
    pub identity_id: String,

    pub name: String,

    /// Lowercased address; unique
    pub address: String,

    /// Argon2 PHC hash
    pub password_hash: String,
}

impl IdentityDoc {
    pub fn into_identity(self) -> Identity {
        Identity {
            id: self.identity_id,
            name: self.name,
            address: self.address,
            password_hash: self.password_hash,
            created_at: self
                .metadata
                .created_at
                .map(|t| t.to_chrono())
                .unwrap_or_default(),
        }
    }
}

impl IntoIndexes for IdentityDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "address": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("address_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "identity_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("identity_id_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for IdentityDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
