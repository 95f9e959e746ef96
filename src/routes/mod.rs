//! HTTP routes for Herald

pub mod auth_routes;
pub mod common;
pub mod feed_ws;
pub mod health;
pub mod posts;

pub use auth_routes::handle_auth_request;
pub use common::{not_found, preflight_response, BoxBody};
pub use feed_ws::handle_feed_ws;
pub use health::{health_check, version_info};
pub use posts::handle_posts_request;
