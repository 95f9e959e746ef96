//! Observer WebSocket at `/api/feed`
//!
//! Each connection registers one [`Subscription`] with the hub and relays
//! its events as JSON text frames until either side closes.

use futures_util::{SinkExt, StreamExt};
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use std::time::Instant;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use super::common::{json_response, to_boxed, BoxBody, ErrorResponse};
use crate::feed::{BroadcastHub, ClientMessage, FeedEvent, Subscription};
use crate::logging::ActivityLogger;
use crate::server::AppState;

/// WebSocket type after upgrade
type HyperWebSocket =
    hyper_tungstenite::WebSocketStream<hyper_util::rt::TokioIo<hyper::upgrade::Upgraded>>;

pub async fn handle_feed_ws(
    state: Arc<AppState>,
    mut req: Request<hyper::body::Incoming>,
) -> Response<BoxBody> {
    if !hyper_tungstenite::is_upgrade_request(&req) {
        return json_response(
            StatusCode::BAD_REQUEST,
            &ErrorResponse {
                error: "WebSocket upgrade required".into(),
                code: "BAD_REQUEST".into(),
            },
        );
    }

    let (response, websocket) = match hyper_tungstenite::upgrade(&mut req, None) {
        Ok(upgrade) => upgrade,
        Err(e) => {
            error!("WebSocket upgrade failed: {}", e);
            return json_response(
                StatusCode::BAD_REQUEST,
                &ErrorResponse {
                    error: "WebSocket upgrade failed".into(),
                    code: "BAD_REQUEST".into(),
                },
            );
        }
    };

    // Register before the handshake completes so nothing published after
    // the upgrade response is missed
    let subscription = state.hub.register();
    let activity = state.activity.clone();
    let hub = Arc::clone(&state.hub);

    tokio::spawn(async move {
        match websocket.await {
            Ok(ws) => run_observer(ws, subscription, hub, activity).await,
            Err(e) => {
                // Dropping the subscription here unregisters it
                error!("WebSocket connection failed: {}", e);
            }
        }
    });

    to_boxed(response)
}

async fn run_observer(
    ws: HyperWebSocket,
    subscription: Subscription,
    hub: Arc<BroadcastHub>,
    activity: ActivityLogger,
) {
    let id = subscription.id();
    let started = Instant::now();

    activity.log_observer_connected(id.as_u64()).await;
    info!(observer = %id, observers = hub.connection_count(), "Observer connected");

    if let Err(e) = relay(ws, subscription).await {
        warn!(observer = %id, "Feed WebSocket error: {}", e);
    }

    let duration_ms = started.elapsed().as_millis() as u64;
    activity.log_observer_disconnected(id.as_u64(), duration_ms).await;
    info!(observer = %id, observers = hub.connection_count(), "Observer disconnected");
}

async fn relay(
    ws: HyperWebSocket,
    mut subscription: Subscription,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (mut sender, mut receiver) = ws.split();

    let hello = FeedEvent::Connected {
        connection_id: subscription.id().as_u64(),
    };
    sender.send(WsMessage::Text(serde_json::to_string(&hello)?)).await?;

    loop {
        tokio::select! {
            event = subscription.recv() => {
                match event {
                    Some(event) => {
                        let json = serde_json::to_string(event.as_ref())?;
                        if sender.send(WsMessage::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    // Hub dropped us (queue overflow) or is shutting down
                    None => {
                        let _ = sender.send(WsMessage::Close(None)).await;
                        break;
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Ping) => {
                                let pong = FeedEvent::Pong {
                                    timestamp: chrono::Utc::now().to_rfc3339(),
                                };
                                sender.send(WsMessage::Text(serde_json::to_string(&pong)?)).await?;
                            }
                            Err(_) => debug!("Ignoring observer message: {}", text),
                        }
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        sender.send(WsMessage::Pong(data)).await?;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    Ok(())
}
