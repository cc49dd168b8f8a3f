//! # Tasca API Server
//!
//! REST API for todos with tasks, progress tracking, pomodoro statistics
//! and deadline reminders.
//!
//! ## Architecture
//!
//! The API server is built with Axum and provides:
//! - Account endpoints (local credentials and Google sign-in)
//! - Ownership-checked todo and task CRUD
//! - Pomodoro and weekly statistics
//! - An in-process deadline reminder scheduler when push is configured
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p tasca-api
//! ```

use std::sync::Arc;

use tasca_api::{
    app::{build_router, AppState},
    config::Config,
};
use tasca_shared::{
    db::{
        migrations::{get_migration_status, run_migrations},
        pool::{close_pool, create_pool},
    },
    integrations::{
        email::{BrevoGateway, Mailbox},
        google::GoogleTokenVerifier,
        push::OneSignalGateway,
        storage::S3BlobStore,
    },
    services::password_reset::ResetMailer,
};
use tasca_worker::build_scheduler;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the filter reads RUST_LOG
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tasca_api=debug,tasca_shared=info,tasca_worker=info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Tasca API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let bind_address = config.bind_address();

    let pool = create_pool(config.database.clone()).await?;
    run_migrations(&pool).await?;

    let migrations = get_migration_status(&pool).await?;
    tracing::info!(
        applied = migrations.applied_migrations,
        latest = ?migrations.latest_version,
        "Database schema ready"
    );

    let mut state = AppState::new(pool.clone(), config.clone());

    match config.storage.s3.clone() {
        Some(s3) => {
            tracing::info!(bucket = %s3.bucket, "Profile picture storage enabled");
            state = state.with_blob_store(Arc::new(S3BlobStore::connect(s3).await));
        }
        None => tracing::warn!("S3_BUCKET not set; profile picture uploads are disabled"),
    }

    match &config.email {
        Some(email) => {
            let gateway = match &email.base_url {
                Some(base_url) => BrevoGateway::with_base_url(email.api_key.clone(), base_url.clone()),
                None => BrevoGateway::new(email.api_key.clone()),
            };
            let sender = Mailbox::new(email.sender_name.clone(), email.sender_address.clone());
            state = state.with_mailer(ResetMailer::new(Arc::new(gateway), sender, email.reset_url.clone()));
        }
        None => tracing::warn!("BREVO_API_KEY not set; password reset emails are disabled"),
    }

    match &config.google {
        Some(google) => {
            let verifier = match &google.tokeninfo_url {
                Some(url) => GoogleTokenVerifier::with_tokeninfo_url(google.client_id.clone(), url.clone()),
                None => GoogleTokenVerifier::new(google.client_id.clone()),
            };
            state = state.with_identity_verifier(Arc::new(verifier));
        }
        None => tracing::warn!("GOOGLE_CLIENT_ID not set; Google sign-in is disabled"),
    }

    let reminders = match config.push.clone() {
        Some(push) => {
            let gateway = Arc::new(OneSignalGateway::new(push));
            let scheduler = build_scheduler(pool.clone(), gateway, config.scheduler.interval);
            let shutdown = scheduler.shutdown_token();
            Some((shutdown, scheduler.spawn()))
        }
        None => {
            tracing::warn!("OneSignal credentials not set; deadline reminders are disabled");
            None
        }
    };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received, draining connections...");
        })
        .await?;

    if let Some((shutdown, handle)) = reminders {
        shutdown.cancel();
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Deadline scheduler task failed");
        }
    }

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}
