//! Logging infrastructure for Herald
//!
//! Diagnostic logging goes through `tracing`; the activity log is a separate
//! append-only JSONL record of account and feed events.

pub mod activity;

pub use activity::{ActivityEvent, ActivityLogger, EventType};
