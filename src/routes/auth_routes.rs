//! HTTP Routes for Authentication
//!
//! - POST /api/auth/register - Create an identity (challenge-gated)
//! - POST /api/auth/login    - Authenticate and get a bearer token

use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

use super::common::{
    client_address, error_response, header_str, json_response, method_not_allowed,
    not_found, parse_json_body, BoxBody, CHALLENGE_HEADER,
};
use crate::server::AppState;
use crate::services::RegisterInput;
use crate::store::IdentityView;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: IdentityView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub expires_at: u64,
    pub user: IdentityView,
}

// =============================================================================
// Router
// =============================================================================

/// Handle `/api/auth/*`
pub async fn handle_auth_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    peer: SocketAddr,
) -> Response<BoxBody> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    match (method, path.as_str()) {
        (Method::POST, "/api/auth/register") => handle_register(req, state, peer).await,
        (Method::POST, "/api/auth/login") => handle_login(req, state).await,
        (_, "/api/auth/register") | (_, "/api/auth/login") => method_not_allowed(),
        _ => not_found(&path),
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

async fn handle_register(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    peer: SocketAddr,
) -> Response<BoxBody> {
    let challenge_token = header_str(&req, CHALLENGE_HEADER).map(str::to_string);
    let client_address = client_address(&req, peer);

    let body: RegisterRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    debug!("Registration request from {}", client_address);

    let input = RegisterInput {
        challenge_token,
        client_address: Some(client_address),
        name: body.name,
        address: body.email,
        password: body.password,
    };

    match state.auth.register(input).await {
        Ok(user) => json_response(
            StatusCode::CREATED,
            &RegisterResponse {
                message: "User registered successfully",
                user,
            },
        ),
        Err(e) => error_response(&e),
    }
}

async fn handle_login(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: LoginRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    match state.auth.login(&body.email, &body.password).await {
        Ok(outcome) => json_response(
            StatusCode::OK,
            &LoginResponse {
                message: "Login successful",
                token: outcome.token,
                expires_at: outcome.expires_at,
                user: outcome.identity,
            },
        ),
        Err(e) => error_response(&e),
    }
}
