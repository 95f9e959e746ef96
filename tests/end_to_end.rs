//! End-to-end tests for the register → login → publish → observe flow
//!
//! The first group drives the gateways directly; the second starts the
//! HTTP server on an ephemeral port and talks to it over the network.

use clap::Parser;
use futures_util::StreamExt;
use herald::auth::TokenService;
use herald::config::Args;
use herald::feed::{BroadcastHub, FeedEvent};
use herald::logging::ActivityLogger;
use herald::server::{self, AppState};
use herald::services::{AuthGateway, ChallengeGate, ContentGateway, RegisterInput, StaticGate};
use herald::store::{MemoryContentStore, MemoryIdentityStore};
use herald::types::ErrorKind;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

struct Harness {
    identities: Arc<MemoryIdentityStore>,
    auth: Arc<AuthGateway>,
    content: Arc<ContentGateway>,
    hub: Arc<BroadcastHub>,
}

fn harness_with_gate(gate: Arc<dyn ChallengeGate>) -> Harness {
    let identities = Arc::new(MemoryIdentityStore::new());
    let entries = Arc::new(MemoryContentStore::new());
    let tokens = Arc::new(TokenService::new_dev());
    let hub = BroadcastHub::new(8);
    let activity = ActivityLogger::disabled();

    let auth = Arc::new(AuthGateway::new(
        identities.clone(),
        Arc::clone(&tokens),
        gate,
        activity.clone(),
    ));
    let content = Arc::new(ContentGateway::new(
        entries,
        identities.clone(),
        tokens,
        Arc::clone(&hub),
        activity,
    ));

    Harness {
        identities,
        auth,
        content,
        hub,
    }
}

fn harness() -> Harness {
    harness_with_gate(Arc::new(StaticGate::allow_all()))
}

fn ada() -> RegisterInput {
    RegisterInput {
        challenge_token: Some("token".into()),
        client_address: Some("203.0.113.9".into()),
        name: "Ada".into(),
        address: "ada@example.com".into(),
        password: "hunter2".into(),
    }
}

// =============================================================================
// Gateway-level flow
// =============================================================================

#[tokio::test]
async fn test_register_login_publish_observe() {
    let h = harness();

    let view = h.auth.register(ada()).await.unwrap();
    assert_eq!(view.name, "Ada");
    assert_eq!(view.address, "ada@example.com");

    let login = h.auth.login("ada@example.com", "hunter2").await.unwrap();
    assert_eq!(login.identity.id, view.id);

    let mut observer = h.hub.register();

    let entry = h
        .content
        .create(Some(&login.token), "Hi", Some("body".into()))
        .await
        .unwrap();
    assert_eq!(entry.author_id, view.id);
    assert_eq!(entry.author.name, "Ada");
    assert!(entry.published);

    let event = tokio::time::timeout(Duration::from_secs(1), observer.recv())
        .await
        .unwrap()
        .unwrap();
    match event.as_ref() {
        FeedEvent::NewEntry { entry: received } => assert_eq!(received.id, entry.id),
        other => panic!("unexpected event: {:?}", other),
    }

    // Observers joining after the publish see nothing from before
    let mut late = h.hub.register();
    assert!(late.try_recv().is_none());

    let listed = h.content.list_published().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, entry.id);
}

#[tokio::test]
async fn test_concurrent_duplicate_registrations_leave_one_record() {
    let h = harness();

    let mut second = ada();
    second.address = "  ADA@example.com ".into();

    let (a, b) = tokio::join!(h.auth.register(ada()), h.auth.register(second));

    let outcomes = [a, b];
    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let failure = outcomes.into_iter().find_map(|r| r.err()).unwrap();
    assert_eq!(failure.kind(), ErrorKind::DuplicateIdentity);
    assert_eq!(h.identities.len().await, 1);
}

#[tokio::test]
async fn test_failed_challenge_creates_nothing() {
    let h = harness_with_gate(Arc::new(StaticGate::deny_all()));

    let err = h.auth.register(ada()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChallengeFailed);
    assert!(h.identities.is_empty().await);
}

#[tokio::test]
async fn test_unauthenticated_publish_reaches_no_observer() {
    let h = harness();
    let mut observer = h.hub.register();

    let err = h
        .content
        .create(Some("not-a-token"), "Hi", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    assert!(observer.try_recv().is_none());
    assert!(h.content.list_published().await.unwrap().is_empty());
}

// =============================================================================
// Over the network
// =============================================================================

async fn start_server() -> SocketAddr {
    let h = harness();
    let args = Args::try_parse_from(["herald", "--dev-mode", "--listen", "127.0.0.1:0"]).unwrap();
    let state = Arc::new(AppState::new(
        args,
        h.auth,
        h.content,
        ActivityLogger::disabled(),
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, state));
    addr
}

async fn next_json<S>(ws: &mut S) -> Value
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn test_http_flow_with_live_feed() {
    let addr = start_server().await;
    let base = format!("http://{}", addr);
    let client = reqwest::Client::new();

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/api/feed", addr))
        .await
        .unwrap();
    let hello = next_json(&mut ws).await;
    assert_eq!(hello["type"], "connected");
    assert!(hello["connectionId"].is_u64());

    let resp = client
        .post(format!("{}/api/auth/register", base))
        .header("cf-turnstile-response", "token")
        .json(&json!({"name": "Ada", "email": "ada@example.com", "password": "hunter2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let registered: Value = resp.json().await.unwrap();
    assert_eq!(registered["user"]["email"], "ada@example.com");
    assert!(registered["user"].get("password").is_none());

    let resp = client
        .post(format!("{}/api/auth/register", base))
        .json(&json!({"name": "Ada", "email": "ADA@example.com", "password": "other"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "DUPLICATE_IDENTITY");

    let resp = client
        .post(format!("{}/api/auth/login", base))
        .json(&json!({"email": "ada@example.com", "password": "wrong"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_CREDENTIALS");

    let resp = client
        .post(format!("{}/api/auth/login", base))
        .json(&json!({"email": "ada@example.com", "password": "hunter2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let login: Value = resp.json().await.unwrap();
    let token = login["token"].as_str().unwrap().to_string();
    assert_eq!(login["user"]["id"], registered["user"]["id"]);

    let resp = client
        .post(format!("{}/api/posts", base))
        .json(&json!({"title": "Hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .post(format!("{}/api/posts", base))
        .bearer_auth(&token)
        .json(&json!({"title": "Hi", "content": "body"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["authorId"], registered["user"]["id"]);
    assert_eq!(created["content"], "body");
    assert_eq!(created["author"]["name"], "Ada");

    let pushed = next_json(&mut ws).await;
    assert_eq!(pushed["type"], "newEntry");
    assert_eq!(pushed["entry"]["id"], created["id"]);
    assert_eq!(pushed["entry"]["author"]["name"], "Ada");

    let listed: Value = client
        .get(format!("{}/api/posts", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["author"]["name"], "Ada");

    // Lowercase scheme is accepted
    let resp = client
        .post(format!("{}/api/posts", base))
        .header("authorization", format!("bearer {}", token))
        .json(&json!({"title": "Again"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
}

#[tokio::test]
async fn test_bad_token_is_rejected_before_body_is_read() {
    let addr = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{}/api/posts", addr))
        .bearer_auth("not-a-token")
        .header("content-type", "application/json")
        .body("{bad json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let resp = client
        .post(format!("http://{}/api/posts", addr))
        .header("content-type", "application/json")
        .body("{bad json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_feed_answers_ping() {
    let addr = start_server().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/api/feed", addr))
        .await
        .unwrap();
    let _hello = next_json(&mut ws).await;

    futures_util::SinkExt::send(&mut ws, Message::Text(r#"{"type":"ping"}"#.into()))
        .await
        .unwrap();
    let pong = next_json(&mut ws).await;
    assert_eq!(pong["type"], "pong");
}

#[tokio::test]
async fn test_routing_errors() {
    let addr = start_server().await;
    let base = format!("http://{}", addr);
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/nope", base)).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .get(format!("{}/api/auth/login", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 405);

    let resp = client
        .delete(format!("{}/api/posts", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 405);

    let oversized = "x".repeat(20 * 1024);
    let resp = client
        .post(format!("{}/api/auth/login", base))
        .header("content-type", "application/json")
        .body(format!(r#"{{"email":"{}","password":"p"}}"#, oversized))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let health: Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["healthy"], true);
}
