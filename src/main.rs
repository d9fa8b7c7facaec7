//! Campus Board - role-gated community board service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campus_board::{
    auth::SessionValidator,
    config::Args,
    media::HttpImageStore,
    model::{Comment, Notification, Post, Principal, Subscription},
    search::{ElasticIndex, MemorySearchIndex, SearchIndex},
    server::{self, AppState},
    store::{DocumentStore, MemoryStore, MongoStore},
    Board,
};

/// Session tokens are issued by the identity provider; this only bounds
/// tokens minted by the dev helper.
const SESSION_EXPIRY_SECONDS: u64 = 3600;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    let log_json = args.log_json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("campus_board={},info", log_level).into()),
        )
        .with(log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!log_json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Campus Board");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {} (db {})", args.mongodb_uri, args.mongodb_db);
    info!("Search: {}/{}", args.search_url, args.search_index);
    info!(
        "Image uploads: {}",
        args.image_upload_url.as_deref().unwrap_or("disabled")
    );
    info!("======================================");

    // Document store (in-memory fallback in dev mode)
    let (store, backend): (Arc<dyn DocumentStore>, &'static str) =
        match MongoStore::connect(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(mongo) => {
                ensure_indexes(&mongo).await;
                (Arc::new(mongo), "mongodb")
            }
            Err(e) => {
                if args.dev_mode {
                    warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                    (Arc::new(MemoryStore::new()), "memory")
                } else {
                    error!("MongoDB connection failed: {}", e);
                    std::process::exit(1);
                }
            }
        };

    // Search index
    let index: Arc<dyn SearchIndex> =
        match ElasticIndex::new(&args.search_url, &args.search_index, args.request_timeout()) {
            Ok(index) => Arc::new(index),
            Err(e) if args.dev_mode => {
                warn!("Search client unavailable (dev mode, using in-memory index): {}", e);
                Arc::new(MemorySearchIndex::new())
            }
            Err(e) => {
                error!("Search client unavailable: {}", e);
                std::process::exit(1);
            }
        };

    let mut board = Board::new(store, index);
    if let Some(url) = &args.image_upload_url {
        let images = HttpImageStore::new(url, &args.image_upload_preset, args.request_timeout())?;
        board = board.with_images(Arc::new(images));
    }

    let secret = args
        .jwt_secret()
        .ok_or_else(|| anyhow::anyhow!("JWT secret not configured"))?;
    let sessions = SessionValidator::new(secret, SESSION_EXPIRY_SECONDS)?;

    let state = Arc::new(AppState::new(args, board, sessions, backend));

    server::run(state, shutdown_signal()).await?;
    info!("Campus Board stopped");
    Ok(())
}

async fn ensure_indexes(mongo: &MongoStore) {
    let results = [
        mongo.ensure_indexes::<Principal>().await,
        mongo.ensure_indexes::<Post>().await,
        mongo.ensure_indexes::<Comment>().await,
        mongo.ensure_indexes::<Subscription>().await,
        mongo.ensure_indexes::<Notification>().await,
    ];
    for result in results {
        if let Err(e) = result {
            warn!("Index setup incomplete: {}", e);
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
