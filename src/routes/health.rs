//! Health and version endpoints

use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use super::common::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub observers: usize,
    pub dev_mode: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub commit_full: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Liveness check (/health, /healthz); always 200 while the process runs
pub fn health_check(state: Arc<AppState>) -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            healthy: true,
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: state.started_at.elapsed().as_secs(),
            observers: state.hub.connection_count(),
            dev_mode: state.args.dev_mode,
        },
    )
}

/// Build information stamped by build.rs
pub fn version_info() -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &VersionResponse {
            version: env!("CARGO_PKG_VERSION"),
            commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
            commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
            build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
            service: "herald",
        },
    )
}
