//! Entry document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::store::{Entry, EntryAuthor};

/// Collection name for entries
pub const ENTRY_COLLECTION: &str = "entries";

/// Entry document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EntryDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub entry_id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub author_id: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub published: bool,
}

impl EntryDoc {
    pub fn into_entry(self) -> Entry {
        Entry {
            id: self.entry_id,
            title: self.title,
            body: self.body,
            author_id: self.author_id,
            author: EntryAuthor {
                name: self.author_name,
            },
            published: self.published,
            created_at: self
                .metadata
                .created_at
                .map(|t| t.to_chrono())
                .unwrap_or_default(),
        }
    }
}

impl IntoIndexes for EntryDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Listing: published entries newest first
            (
                doc! { "published": 1, "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("published_created_at".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "author_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("author_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for EntryDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
