//! Activity logging
//!
//! Appends account and feed activity to a JSONL file for offline auditing.
//! Without a configured file every call is a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Activity event types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    IdentityRegistered,
    LoginAttempt,
    EntryPublished,
    ObserverConnected,
    ObserverDisconnected,
}

/// One line of the activity log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    /// Identity the event concerns, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Observers that accepted a published entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipients: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ActivityEvent {
    pub fn new(event_type: EventType) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            identity_id: None,
            entry_id: None,
            connection_id: None,
            success: None,
            recipients: None,
            duration_ms: None,
        }
    }

    pub fn with_identity(mut self, identity_id: impl Into<String>) -> Self {
        self.identity_id = Some(identity_id.into());
        self
    }

    pub fn with_entry(mut self, entry_id: impl Into<String>) -> Self {
        self.entry_id = Some(entry_id.into());
        self
    }

    pub fn with_connection(mut self, connection_id: u64) -> Self {
        self.connection_id = Some(connection_id);
        self
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    pub fn with_recipients(mut self, recipients: usize) -> Self {
        self.recipients = Some(recipients);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Writes activity events to a JSONL file
#[derive(Clone, Default)]
pub struct ActivityLogger {
    inner: Arc<Mutex<Option<BufWriter<File>>>>,
}

impl ActivityLogger {
    /// Logger that discards everything
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Logger appending to `path`, creating it if needed
    pub fn to_file(path: PathBuf) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!("Activity logging initialized to {}", path.display());

        Ok(Self {
            inner: Arc::new(Mutex::new(Some(BufWriter::new(file)))),
        })
    }

    pub async fn log(&self, event: ActivityEvent) {
        let mut inner = self.inner.lock().await;
        let Some(writer) = inner.as_mut() else {
            return;
        };

        let line = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize activity event: {}", e);
                return;
            }
        };

        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            error!("Failed to write activity event: {}", e);
        }
    }

    pub async fn log_registration(&self, identity_id: &str) {
        self.log(ActivityEvent::new(EventType::IdentityRegistered).with_identity(identity_id))
            .await;
    }

    /// The address is deliberately not recorded for failed attempts
    pub async fn log_login_attempt(&self, success: bool, identity_id: Option<&str>) {
        let mut event = ActivityEvent::new(EventType::LoginAttempt).with_success(success);
        if let Some(id) = identity_id {
            event = event.with_identity(id);
        }
        self.log(event).await;
    }

    pub async fn log_published(&self, identity_id: &str, entry_id: &str, recipients: usize) {
        self.log(
            ActivityEvent::new(EventType::EntryPublished)
                .with_identity(identity_id)
                .with_entry(entry_id)
                .with_recipients(recipients),
        )
        .await;
    }

    pub async fn log_observer_connected(&self, connection_id: u64) {
        self.log(ActivityEvent::new(EventType::ObserverConnected).with_connection(connection_id))
            .await;
    }

    pub async fn log_observer_disconnected(&self, connection_id: u64, duration_ms: u64) {
        self.log(
            ActivityEvent::new(EventType::ObserverDisconnected)
                .with_connection(connection_id)
                .with_duration(duration_ms),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = ActivityEvent::new(EventType::EntryPublished)
            .with_identity("identity-1")
            .with_entry("entry-1")
            .with_recipients(3);

        let jsonl = event.to_jsonl().unwrap();
        assert!(jsonl.contains("entry_published"));
        assert!(jsonl.contains("\"recipients\":3"));
        assert!(!jsonl.contains("duration_ms"));
    }

    #[tokio::test]
    async fn test_file_logging_appends_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("activity.jsonl");
        let logger = ActivityLogger::to_file(path.clone()).unwrap();

        logger.log_registration("identity-1").await;
        logger.log_login_attempt(false, None).await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("identity_registered"));
        assert!(lines[1].contains("\"success\":false"));
    }

    #[tokio::test]
    async fn test_disabled_logger_is_noop() {
        let logger = ActivityLogger::disabled();
        logger.log_observer_connected(7).await;
    }
}
