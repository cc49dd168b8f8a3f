//! # Tasca Worker
//!
//! Standalone deadline-reminder process. The API server runs the same
//! scheduler in-process when push credentials are configured; this binary
//! is for deployments that keep reminders in a separate process.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p tasca-worker
//! ```

use std::sync::Arc;

use tasca_shared::db::pool::{close_pool, create_pool};
use tasca_shared::integrations::push::OneSignalGateway;
use tasca_worker::{build_scheduler, config::WorkerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tasca_worker=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Tasca Worker v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::from_env()?;
    let pool = create_pool(config.database.clone()).await?;

    let gateway = Arc::new(OneSignalGateway::new(config.push.clone()));
    let scheduler = build_scheduler(pool.clone(), gateway, config.scan_interval);
    let shutdown = scheduler.shutdown_token();
    let handle = scheduler.spawn();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping scheduler...");

    shutdown.cancel();
    handle.await?;
    close_pool(pool).await;

    Ok(())
}
