//! Services for Herald
//!
//! - **Challenge**: anti-automation gate consulted on registration
//! - **Auth gateway**: registration and login
//! - **Content gateway**: authenticated entry creation with fan-out

pub mod auth_gateway;
pub mod challenge;
pub mod content_gateway;

pub use auth_gateway::{AuthGateway, LoginOutcome, RegisterInput};
pub use challenge::{ChallengeConfig, ChallengeGate, StaticGate, TurnstileGate, TURNSTILE_VERIFY_URL};
pub use content_gateway::ContentGateway;
