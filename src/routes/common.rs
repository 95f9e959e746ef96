//! Response and request helpers shared by the HTTP routes

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::{error, warn};

use crate::types::HeraldError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Largest request body accepted by the JSON endpoints
pub const MAX_BODY_BYTES: usize = 10 * 1024;

/// Header carrying the human-verification token on registration
pub const CHALLENGE_HEADER: &str = "cf-turnstile-response";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

pub fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

fn with_cors(response: &mut Response<BoxBody>) {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization, cf-turnstile-response"),
    );
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|e| {
        error!("Failed to serialize response body: {}", e);
        r#"{"error":"Internal server error","code":"INTERNAL_ERROR"}"#.to_string()
    });

    let mut response = Response::new(full_body(json));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    with_cors(&mut response);
    response
}

/// Typed rejection as `{"error": ..., "code": ...}`
pub fn error_response(err: &HeraldError) -> Response<BoxBody> {
    let status = err.status_code();
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }

    json_response(
        status,
        &ErrorResponse {
            error: err.public_message(),
            code: err.kind().as_str().to_string(),
        },
    )
}

pub fn method_not_allowed() -> Response<BoxBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorResponse {
            error: "Method not allowed".into(),
            code: "METHOD_NOT_ALLOWED".into(),
        },
    )
}

pub fn not_found(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("No route for {}", path),
            code: "NOT_FOUND".into(),
        },
    )
}

pub fn preflight_response() -> Response<BoxBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = StatusCode::NO_CONTENT;
    with_cors(&mut response);
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    response
}

pub async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<hyper::body::Incoming>,
) -> Result<T, HeraldError> {
    let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            warn!("Rejected request body: {}", e);
            HeraldError::Http("Request body too large or unreadable".into())
        })?;

    serde_json::from_slice(&body.to_bytes())
        .map_err(|e| HeraldError::Http(format!("Invalid JSON: {}", e)))
}

pub fn header_str<'a, B>(req: &'a Request<B>, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Client address: first `x-forwarded-for` hop, else the peer socket
pub fn client_address<B>(req: &Request<B>, peer: SocketAddr) -> String {
    header_str(req, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}
