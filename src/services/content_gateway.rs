//! Authenticated entry creation and listing
//!
//! Creation persists first and broadcasts second. Once the store has
//! committed the entry the operation succeeds regardless of what happens
//! during fan-out.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::TokenService;
use crate::feed::BroadcastHub;
use crate::logging::ActivityLogger;
use crate::store::{ContentStore, Entry, IdentityStore, NewEntry};
use crate::types::{HeraldError, Result};

pub struct ContentGateway {
    entries: Arc<dyn ContentStore>,
    identities: Arc<dyn IdentityStore>,
    tokens: Arc<TokenService>,
    hub: Arc<BroadcastHub>,
    activity: ActivityLogger,
}

impl ContentGateway {
    pub fn new(
        entries: Arc<dyn ContentStore>,
        identities: Arc<dyn IdentityStore>,
        tokens: Arc<TokenService>,
        hub: Arc<BroadcastHub>,
        activity: ActivityLogger,
    ) -> Self {
        Self {
            entries,
            identities,
            tokens,
            hub,
            activity,
        }
    }

    /// Identity id the token is bound to, or `Unauthenticated`
    pub fn authenticate(&self, token: Option<&str>) -> Result<String> {
        token
            .and_then(|t| self.tokens.verify(t))
            .ok_or(HeraldError::Unauthenticated)
    }

    /// Create an entry on behalf of the token's identity and broadcast it
    pub async fn create(&self, token: Option<&str>, title: &str, body: Option<String>) -> Result<Entry> {
        let author_id = self.authenticate(token)?;

        let title = title.trim();
        if title.is_empty() {
            return Err(HeraldError::InvalidInput("Title is required".into()));
        }

        let Some(author) = self.identities.find_by_id(&author_id).await? else {
            warn!(identity = %author_id, "Valid token for unknown identity");
            return Err(HeraldError::Unauthenticated);
        };

        let entry = self
            .entries
            .create(NewEntry {
                title: title.to_string(),
                body: body.unwrap_or_default(),
                author_id,
                author_name: author.name,
                published: true,
            })
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to persist entry");
                HeraldError::from(e)
            })?;

        info!(entry = %entry.id, author = %entry.author_id, "Entry created");

        let recipients = self.hub.publish(&entry);
        self.activity
            .log_published(&entry.author_id, &entry.id, recipients)
            .await;

        Ok(entry)
    }

    /// Published entries, newest first
    pub async fn list_published(&self) -> Result<Vec<Entry>> {
        self.entries.list_published().await.map_err(|e| {
            error!(error = %e, "Failed to list entries");
            HeraldError::from(e)
        })
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }
}
