//! Herald - authenticated posting gateway with a live feed
//!
//! Registered identities log in, obtain a bearer token, and publish short
//! text entries that are pushed to every connected WebSocket observer as
//! soon as they are committed.
//!
//! ## Components
//!
//! - **Auth**: Argon2 credential hashing and HS256 bearer tokens
//! - **Services**: Challenge gate, auth gateway, content gateway
//! - **Feed**: Broadcast hub with bounded per-observer queues
//! - **Store**: Identity and content stores (in-memory or MongoDB)

pub mod auth;
pub mod config;
pub mod db;
pub mod feed;
pub mod logging;
pub mod routes;
pub mod server;
pub mod services;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{HeraldError, Result};
