//! Content routes
//!
//! - GET  /api/posts - Published entries, newest first
//! - POST /api/posts - Create an entry (bearer token required)

use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use super::common::{
    error_response, header_str, json_response, method_not_allowed, parse_json_body, BoxBody,
};
use crate::auth::extract_token_from_header;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Handle `/api/posts`
pub async fn handle_posts_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    match *req.method() {
        Method::GET => match state.content.list_published().await {
            Ok(entries) => json_response(StatusCode::OK, &entries),
            Err(e) => error_response(&e),
        },
        Method::POST => handle_create(req, state).await,
        _ => method_not_allowed(),
    }
}

async fn handle_create(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let token = extract_token_from_header(header_str(&req, "authorization")).map(str::to_string);

    // Reject before reading the body when the credential is missing or invalid
    if let Err(e) = state.content.authenticate(token.as_deref()) {
        return error_response(&e);
    }

    let body: CreatePostRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    match state
        .content
        .create(token.as_deref(), &body.title, body.content)
        .await
    {
        Ok(entry) => json_response(StatusCode::CREATED, &entry),
        Err(e) => error_response(&e),
    }
}
