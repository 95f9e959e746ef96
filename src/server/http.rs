//! HTTP server implementation
//!
//! hyper http1 with TokioIo; upgrades are enabled for the observer feed.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::Args;
use crate::feed::BroadcastHub;
use crate::logging::ActivityLogger;
use crate::routes::{self, BoxBody};
use crate::services::{AuthGateway, ContentGateway};
use crate::types::HeraldError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub auth: Arc<AuthGateway>,
    pub content: Arc<ContentGateway>,
    /// Observer registry; the same hub the content gateway publishes to
    pub hub: Arc<BroadcastHub>,
    pub activity: ActivityLogger,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        args: Args,
        auth: Arc<AuthGateway>,
        content: Arc<ContentGateway>,
        activity: ActivityLogger,
    ) -> Self {
        let hub = Arc::clone(content.hub());
        Self {
            args,
            auth,
            content,
            hub,
            activity,
            started_at: Instant::now(),
        }
    }
}

/// Start the HTTP server on `state.args.listen`
pub async fn run(state: Arc<AppState>) -> Result<(), HeraldError> {
    let listener = TcpListener::bind(state.args.listen).await?;
    info!("Herald listening on {}", listener.local_addr()?);

    if state.args.dev_mode {
        warn!("Development mode enabled - insecure token secret and challenge bypass may be active");
    }

    serve(listener, state).await
}

/// Accept loop over an already-bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), HeraldError> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .with_upgrades()
                        .await
                    {
                        debug!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    if method == Method::OPTIONS {
        return Ok(routes::preflight_response());
    }

    let response = match path.as_str() {
        p if p.starts_with("/api/auth/") => routes::handle_auth_request(req, state, addr).await,

        "/api/posts" => routes::handle_posts_request(req, state).await,

        "/api/feed" if method == Method::GET => routes::handle_feed_ws(state, req).await,

        "/health" | "/healthz" if method == Method::GET => routes::health_check(state),

        "/version" if method == Method::GET => routes::version_info(),

        "/api/feed" | "/health" | "/healthz" | "/version" => {
            routes::common::method_not_allowed()
        }

        _ => routes::not_found(&path),
    };

    Ok(response)
}
