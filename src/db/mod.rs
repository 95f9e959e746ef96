//! MongoDB persistence
//!
//! Integration with a live server is not covered by unit tests; the
//! in-memory stores in [`crate::store::memory`] share the same traits.

pub mod mongo;
pub mod schemas;
pub mod stores;

pub use mongo::MongoClient;
pub use stores::{MongoContentStore, MongoIdentityStore};
