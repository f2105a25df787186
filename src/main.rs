// src/main.rs

mod config;
mod db;
mod error;
mod models;
mod services;
mod state;
mod storage;
mod templates;
mod web;

use crate::{config::AppConfig, services::auth_service, state::AppState, storage::FileStorage};
use axum::serve;
use std::env;
use time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tower_sessions::{ExpiredDeletion, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Logging ---
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            env::var("RUST_LOG")
                .unwrap_or_else(|_| "lor_server=debug,tower_http=info,sqlx=warn,tower_sessions=info".into())
                .into()
        }))
        .with(fmt::layer())
        .init();

    tracing::info!("🚀 Starting LOR server...");

    let config = AppConfig::from_env().map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    // --- Database ---
    let db_pool = match db::create_db_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("❌ Failed to initialise the database: {}", e);
            return Err(anyhow::anyhow!("Failed to connect/migrate DB: {}", e));
        }
    };

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        auth_service::seed_admin(&db_pool, email, password)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to seed admin account: {}", e))?;
    }

    // --- Sessions ---
    let session_store = SqliteStore::new(db_pool.clone())
        .with_table_name("sessions")
        .map_err(|e| anyhow::anyhow!("Failed to create session store: {}", e))?;
    session_store
        .migrate()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to migrate session store: {}", e))?;

    let cleanup_store = session_store.clone();
    tokio::spawn(async move {
        if let Err(e) = cleanup_store
            .continuously_delete_expired(tokio::time::Duration::from_secs(60 * 60))
            .await
        {
            tracing::error!("Session cleanup task failed: {:?}", e);
        }
    });
    tracing::info!("🧹 Session cleanup task started.");

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::days(config.session_days)));

    // --- Storage ---
    tokio::fs::create_dir_all(&config.storage_dir).await?;
    let storage = FileStorage::new(config.storage_dir.clone());
    tracing::info!("📁 Documents stored under {}", storage.root().display());

    let addr = config.bind_addr;
    let app_state = AppState { db_pool, storage };

    // --- Listener ---
    tracing::info!("📡 Listening on http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("❌ Failed to bind {}: {}", addr, e);
            return Err(e.into());
        }
    };

    let app = web::routes::create_router(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(session_layer),
    );

    tracing::info!("👂 Server ready.");
    if let Err(e) = serve(listener, app.into_make_service()).await {
        tracing::error!("❌ Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
