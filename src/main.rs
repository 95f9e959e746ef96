//! Herald - authenticated posting gateway with a live feed

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use herald::{
    auth::{SystemClock, TokenService},
    config::Args,
    db::{MongoClient, MongoContentStore, MongoIdentityStore},
    feed::BroadcastHub,
    logging::ActivityLogger,
    server::{self, AppState},
    services::{AuthGateway, ChallengeConfig, ChallengeGate, ContentGateway, StaticGate, TurnstileGate},
    store::{ContentStore, IdentityStore, MemoryContentStore, MemoryIdentityStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("herald={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Herald - posting gateway");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Token lifetime: {}s", args.jwt_expiry_seconds);
    info!("Challenge: {}", args.challenge_url);
    info!(
        "MongoDB: {}",
        if args.mongodb_uri.is_some() { args.mongodb_db.as_str() } else { "(in-memory stores)" }
    );
    info!("Feed buffer: {}", args.feed_buffer);
    info!("======================================");

    let tokens = Arc::new(match args.jwt_secret.as_deref() {
        Some(secret) if !secret.is_empty() => {
            TokenService::new(secret, args.jwt_expiry_seconds, Arc::new(SystemClock))?
        }
        _ => {
            warn!("Using development token secret - do not use in production");
            TokenService::new_dev()
        }
    });

    let challenge: Arc<dyn ChallengeGate> = match args.challenge_secret.as_deref() {
        Some(secret) if !secret.is_empty() => {
            let mut config = ChallengeConfig::new(secret);
            config.verify_url = args.challenge_url.clone();
            config.timeout = args.challenge_timeout();
            Arc::new(TurnstileGate::new(config)?)
        }
        _ => {
            warn!("No challenge secret configured (dev mode) - registrations are not challenge-gated");
            Arc::new(StaticGate::allow_all())
        }
    };

    let (identities, entries) = open_stores(&args).await;

    let activity = match args.activity_log.clone() {
        Some(path) => match ActivityLogger::to_file(path.clone()) {
            Ok(logger) => {
                info!("Activity log: {}", path.display());
                logger
            }
            Err(e) => {
                warn!("Failed to open activity log {}: {}", path.display(), e);
                ActivityLogger::disabled()
            }
        },
        None => ActivityLogger::disabled(),
    };

    let hub = BroadcastHub::new(args.feed_buffer);

    let auth = Arc::new(AuthGateway::new(
        Arc::clone(&identities),
        Arc::clone(&tokens),
        challenge,
        activity.clone(),
    ));
    let content = Arc::new(ContentGateway::new(
        entries,
        identities,
        tokens,
        hub,
        activity.clone(),
    ));

    let state = Arc::new(AppState::new(args, auth, content, activity));

    if let Err(e) = server::run(state).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// MongoDB stores when configured; in-memory stores otherwise.
/// Connection failure is fatal outside dev mode.
async fn open_stores(args: &Args) -> (Arc<dyn IdentityStore>, Arc<dyn ContentStore>) {
    let Some(uri) = args.mongodb_uri.as_deref() else {
        info!("No MongoDB URI configured, using in-memory stores");
        return memory_stores();
    };

    let opened = async {
        let client = MongoClient::new(uri, &args.mongodb_db).await?;
        let identities = MongoIdentityStore::new(&client).await?;
        let entries = MongoContentStore::new(&client).await?;
        Ok::<_, herald::HeraldError>((identities, entries))
    }
    .await;

    match opened {
        Ok((identities, entries)) => {
            info!("MongoDB connected successfully");
            (Arc::new(identities), Arc::new(entries))
        }
        Err(e) if args.dev_mode => {
            warn!("MongoDB connection failed (dev mode, continuing in-memory): {}", e);
            memory_stores()
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn memory_stores() -> (Arc<dyn IdentityStore>, Arc<dyn ContentStore>) {
    (
        Arc::new(MemoryIdentityStore::new()),
        Arc::new(MemoryContentStore::new()),
    )
}
