//! # taskclock API Server
//!
//! HTTP API for tasks, comments, timers and time reports.
//!
//! ## Architecture
//!
//! - Axum router with JWT authentication on everything under `/v1`
//! - PostgreSQL store (or the in-memory store for `DATABASE_URL=memory://`)
//! - Notification events published to a Redis stream for the worker; without
//!   `REDIS_URL` they are only logged
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskclock-api
//! ```

use std::sync::Arc;
use taskclock_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskclock_shared::{
    db::{migrations::run_migrations, pool::create_pool, pool::DatabaseConfig},
    events::{EventPublisher, LogEventPublisher, RedisEventPublisher},
    redis::{RedisClient, RedisConfig},
    store::{MemoryStore, PgStore, Store},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskclock_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "taskclock API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = if config.database.is_memory() {
        tracing::warn!("Using in-memory store; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let pool = create_pool(DatabaseConfig::new(
            config.database.url.clone(),
            config.database.max_connections,
        ))
        .await?;
        run_migrations(&pool).await?;
        Arc::new(PgStore::new(pool))
    };

    let events: Arc<dyn EventPublisher> = match config.redis_url.clone() {
        Some(url) => {
            let client = RedisClient::new(RedisConfig {
                url,
                command_timeout_secs: 5,
            })
            .await?;
            Arc::new(RedisEventPublisher::new(client))
        }
        None => {
            tracing::warn!("REDIS_URL not set; notification events will only be logged");
            Arc::new(LogEventPublisher)
        }
    };

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(store, events, config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, exiting...");
}
