//! Database schemas for Herald
//!
//! Defines MongoDB document structures for identities and entries.

mod entry;
mod identity;
mod metadata;

pub use entry::{EntryDoc, ENTRY_COLLECTION};
pub use identity::{IdentityDoc, IDENTITY_COLLECTION};
pub use metadata::Metadata;
