//! # taskclock Worker
//!
//! Runs two loops until ctrl-c:
//!
//! - the notification consumer, reading the `notifications` Redis stream and
//!   mailing each event
//! - the weekly report job, mailing every active user a summary of their
//!   last seven days
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskclock-worker
//! ```

use std::sync::Arc;
use taskclock_shared::{
    db::{migrations::run_migrations, pool::create_pool, pool::DatabaseConfig},
    redis::{RedisClient, RedisConfig},
    store::{MemoryStore, PgStore, Store},
};
use taskclock_worker::{
    config::WorkerConfig,
    consumer::NotificationConsumer,
    mailer::{LogMailer, Mailer},
    weekly::WeeklyReportJob,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// `DATABASE_URL` value selecting the in-memory store
const MEMORY_DATABASE_URL: &str = "memory://";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskclock_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "taskclock Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = WorkerConfig::from_env()?;

    let store: Arc<dyn Store> = if config.database_url == MEMORY_DATABASE_URL {
        tracing::warn!("Using in-memory store; weekly reports will be empty");
        Arc::new(MemoryStore::new())
    } else {
        let pool = create_pool(DatabaseConfig::new(
            config.database_url.clone(),
            config.max_connections,
        ))
        .await?;
        run_migrations(&pool).await?;
        Arc::new(PgStore::new(pool))
    };

    let redis = RedisClient::new(RedisConfig {
        url: config.redis_url.clone(),
        command_timeout_secs: 5,
    })
    .await?;

    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer::new(config.mail_from.clone()));
    let shutdown = CancellationToken::new();

    let consumer = NotificationConsumer::new(redis, mailer.clone(), config.consumer.clone());
    let consumer_handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { consumer.run(shutdown).await })
    };

    let weekly = WeeklyReportJob::new(store, mailer);
    let weekly_handle = {
        let shutdown = shutdown.clone();
        let period = config.weekly_interval;
        tokio::spawn(async move { weekly.run(period, shutdown).await })
    };

    tracing::info!("Worker ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping...");
    shutdown.cancel();

    if let Err(e) = consumer_handle.await? {
        tracing::error!(error = %e, "Notification consumer exited with error");
    }
    weekly_handle.await?;

    tracing::info!("Worker stopped");
    Ok(())
}
