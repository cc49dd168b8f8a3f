/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use tasca_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = tasca_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tasca_shared::{
    auth::{
        jwt::TokenLifetimes,
        middleware::{jwt_auth_middleware, AuthError},
    },
    integrations::{google::IdentityVerifier, storage::BlobStore},
    services::{password_reset::ResetMailer, profile::ProfileAssets},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Largest accepted profile upload body
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Profile picture storage
    pub assets: ProfileAssets,

    /// Password reset mail delivery; `None` answers 503
    pub mailer: Option<ResetMailer>,

    /// Google ID token verification; `None` answers 503
    pub google: Option<Arc<dyn IdentityVerifier>>,
}

impl AppState {
    /// Creates state with no optional integrations
    pub fn new(db: PgPool, config: Config) -> Self {
        let assets = ProfileAssets::new(None, config.storage.default_picture_key.clone());

        Self {
            db,
            config: Arc::new(config),
            assets,
            mailer: None,
            google: None,
        }
    }

    pub fn with_blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.assets.store = Some(store);
        self
    }

    pub fn with_mailer(mut self, mailer: ResetMailer) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn with_identity_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.google = Some(verifier);
        self
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    pub fn token_lifetimes(&self) -> TokenLifetimes {
        self.config.jwt.lifetimes
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// └── /v1/
///     ├── /auth/                       # Public
///     │   ├── POST /register | /login | /refresh | /google
///     │   └── POST /password/forgot | /password/validate | /password/reset
///     ├── /profile                     # Bearer token required from here on
///     │   ├── GET | PATCH | DELETE /
///     │   ├── DELETE /picture
///     │   ├── PATCH  /password
///     │   └── POST   /google/link | /google/unlink
///     ├── /todos                       # GET, POST
///     │   └── /:id                     # GET, PATCH, DELETE
///     │       └── /tasks               # GET, POST, /incomplete, /complete
///     │           └── /:task_id        # GET, PATCH, DELETE, PATCH /complete
///     ├── /tasks/search | /by-date/:date | /weekly-stats
///     ├── /pomodoro/complete | /daily | /weekly
///     └── /devices                     # GET, POST, DELETE
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Response compression (gzip, brotli)
/// 4. Logging (tower-http TraceLayer)
/// 5. Authentication (protected routes only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/google", post(routes::auth::google_sign_in))
        .route("/password/forgot", post(routes::auth::forgot_password))
        .route("/password/validate", post(routes::auth::validate_reset_token))
        .route("/password/reset", post(routes::auth::reset_password));

    let profile_routes = Router::new()
        .route(
            "/",
            get(routes::profile::get_profile)
                .patch(routes::profile::update_profile)
                .delete(routes::profile::delete_account),
        )
        .route("/picture", delete(routes::profile::delete_picture))
        .route("/password", patch(routes::profile::change_password))
        .route("/google/link", post(routes::profile::link_google))
        .route("/google/unlink", post(routes::profile::unlink_google))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    let todo_routes = Router::new()
        .route("/", get(routes::todos::list_todos).post(routes::todos::create_todo))
        .route(
            "/:id",
            get(routes::todos::get_todo)
                .patch(routes::todos::update_todo)
                .delete(routes::todos::delete_todo),
        )
        .route(
            "/:id/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/:id/tasks/incomplete", get(routes::tasks::list_incomplete_tasks))
        .route("/:id/tasks/complete", get(routes::tasks::list_complete_tasks))
        .route(
            "/:id/tasks/:task_id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/tasks/:task_id/complete", patch(routes::tasks::set_task_completion));

    let task_routes = Router::new()
        .route("/search", get(routes::tasks::search_tasks))
        .route("/by-date/:date", get(routes::tasks::tasks_by_date))
        .route("/weekly-stats", get(routes::tasks::weekly_stats));

    let pomodoro_routes = Router::new()
        .route("/complete", post(routes::pomodoro::complete_session))
        .route("/daily", get(routes::pomodoro::daily_focus))
        .route("/weekly", get(routes::pomodoro::weekly_focus));

    let device_routes = Router::new().route(
        "/",
        get(routes::devices::list_devices)
            .post(routes::devices::register_device)
            .delete(routes::devices::unregister_device),
    );

    let protected_routes = Router::new()
        .nest("/profile", profile_routes)
        .nest("/todos", todo_routes)
        .nest("/tasks", task_routes)
        .nest("/pomodoro", pomodoro_routes)
        .nest("/devices", device_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Validates the bearer access token with the configured secret and injects
/// `AuthContext` into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    jwt_auth_middleware(state.config.jwt.secret.clone(), req, next).await
}
