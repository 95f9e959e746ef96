//! Real-time entry feed
//!
//! ## Protocol
//!
//! Connect: `ws://localhost:3000/api/feed`
//!
//! Messages (server → client):
//! - `connected` - sent once after the upgrade, carries the connection id
//! - `newEntry` - an entry was just published
//! - `pong` - reply to a client `ping`
//!
//! Messages (client → server):
//! - `ping` - keep-alive
//!
//! ```json
//! {
//!   "type": "newEntry",
//!   "entry": {
//!     "id": "5b0c6c1e-...",
//!     "title": "Hi",
//!     "content": "body",
//!     "authorId": "0f6f1d2a-...",
//!     "published": true,
//!     "createdAt": "2024-01-15T10:30:00Z"
//!   }
//! }
//! ```

pub mod hub;

use serde::{Deserialize, Serialize};

use crate::store::Entry;

pub use hub::{BroadcastHub, ConnectionId, Subscription, DEFAULT_FEED_BUFFER};

/// Message sent from server to observer
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FeedEvent {
    Connected {
        #[serde(rename = "connectionId")]
        connection_id: u64,
    },
    NewEntry {
        entry: Entry,
    },
    Pong {
        timestamp: String,
    },
}

/// Message received from an observer
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EntryAuthor;
    use chrono::Utc;

    #[test]
    fn test_new_entry_serialization() {
        let event = FeedEvent::NewEntry {
            entry: Entry {
                id: "entry-1".into(),
                title: "Hi".into(),
                body: "body".into(),
                author_id: "ada".into(),
                author: EntryAuthor { name: "Ada".into() },
                published: true,
                created_at: Utc::now(),
            },
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"newEntry\""));
        assert!(json.contains("\"authorId\":\"ada\""));
        assert!(json.contains("\"author\":{\"name\":\"Ada\"}"));
    }

    #[test]
    fn test_connected_serialization() {
        let json = serde_json::to_string(&FeedEvent::Connected { connection_id: 4 }).unwrap();
        assert_eq!(json, r#"{"type":"connected","connectionId":4}"#);
    }

    #[test]
    fn test_client_ping_parses() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }
}
