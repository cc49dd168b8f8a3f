/// Configuration management for the API server
///
/// Loads configuration from environment variables into a type-safe struct.
/// Optional integrations (push, email, storage, Google sign-in) are `None`
/// when their variables are absent; the endpoints that need them answer
/// 503 instead of failing at startup.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `API_HOST` / `API_PORT`: Bind address (default: 0.0.0.0:8080)
/// - `CORS_ORIGINS`: Comma-separated origins, `*` for any (default: *)
/// - `PRODUCTION`: Enables HSTS and the JWT secret length check
/// - `JWT_SECRET`: Secret key for JWT signing (required)
/// - `ONESIGNAL_APP_ID` / `ONESIGNAL_REST_API_KEY`: Enable deadline reminders
/// - `BREVO_API_KEY` / `EMAIL_SENDER_ADDRESS` / `PASSWORD_RESET_URL`: Enable password reset
/// - `S3_BUCKET` and friends: Enable profile pictures
/// - `GOOGLE_CLIENT_ID`: Enables Google sign-in
///
/// # Example
///
/// ```no_run
/// use tasca_api::config::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}:{}", config.api.host, config.api.port);
/// # Ok(())
/// # }
/// ```

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Duration as TimeDelta;
use tasca_shared::auth::jwt::TokenLifetimes;
use tasca_shared::db::pool::DatabaseConfig;
use tasca_shared::integrations::push::OneSignalConfig;
use tasca_shared::integrations::storage::S3Config;
use tasca_worker::config::{push_config_from_env, scan_interval_from_env};

/// Minimum JWT secret length enforced in production
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    /// Deadline reminders run only when this is set
    pub push: Option<OneSignalConfig>,
    pub email: Option<EmailConfig>,
    pub storage: StorageConfig,
    pub google: Option<GoogleConfig>,
    pub scheduler: SchedulerConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; `*` means any
    pub cors_origins: Vec<String>,
    pub production: bool,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
    pub lifetimes: TokenLifetimes,
}

/// Transactional email settings
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub sender_name: String,
    pub sender_address: String,
    /// Link base for reset emails
    pub reset_url: String,
}

/// Profile picture storage
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// `None` disables uploads
    pub s3: Option<S3Config>,
    pub default_picture_key: String,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub tokeninfo_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(name) {
        Some(value) => value
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", name, value)),
        None => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - a numeric variable does not parse
    /// - an integration is only partially configured
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let production = parsed("PRODUCTION", false)?;

        let api = ApiConfig {
            host: optional("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed("API_PORT", 8080u16)?,
            cors_origins: optional("CORS_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            production,
        };

        let database = DatabaseConfig {
            url: optional("DATABASE_URL").context("DATABASE_URL environment variable is required")?,
            max_connections: parsed("DATABASE_MAX_CONNECTIONS", 20u32)?,
            min_connections: parsed("DATABASE_MIN_CONNECTIONS", 2u32)?,
            connect_timeout_seconds: parsed("DATABASE_CONNECT_TIMEOUT", 30u64)?,
            ..Default::default()
        };

        let secret = optional("JWT_SECRET").context("JWT_SECRET environment variable is required")?;
        if production && secret.len() < MIN_JWT_SECRET_LEN {
            bail!("JWT_SECRET must be at least {} characters long", MIN_JWT_SECRET_LEN);
        }

        let jwt = JwtConfig {
            secret,
            lifetimes: TokenLifetimes {
                access: TimeDelta::minutes(parsed("JWT_ACCESS_TTL_MINUTES", 60i64)?),
                refresh: TimeDelta::days(parsed("JWT_REFRESH_TTL_DAYS", 30i64)?),
            },
        };

        Ok(Self {
            api,
            database,
            jwt,
            push: push_config_from_env()?,
            email: email_from_env()?,
            storage: storage_from_env()?,
            google: optional("GOOGLE_CLIENT_ID").map(|client_id| GoogleConfig {
                client_id,
                tokeninfo_url: optional("GOOGLE_TOKENINFO_URL"),
            }),
            scheduler: SchedulerConfig {
                interval: scan_interval_from_env()?,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Minimal configuration for tests and tooling
    pub fn for_database(url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: url.into(),
                ..Default::default()
            },
            jwt: JwtConfig {
                secret: jwt_secret.into(),
                lifetimes: TokenLifetimes::default(),
            },
            push: None,
            email: None,
            storage: StorageConfig {
                s3: None,
                default_picture_key: "nopp.png".to_string(),
            },
            google: None,
            scheduler: SchedulerConfig {
                interval: tasca_worker::scheduler::DEFAULT_SCAN_INTERVAL,
            },
        }
    }
}

fn email_from_env() -> anyhow::Result<Option<EmailConfig>> {
    let Some(api_key) = optional("BREVO_API_KEY") else {
        return Ok(None);
    };

    Ok(Some(EmailConfig {
        api_key,
        base_url: optional("BREVO_BASE_URL"),
        sender_name: optional("EMAIL_SENDER_NAME").unwrap_or_else(|| "Tasca".to_string()),
        sender_address: optional("EMAIL_SENDER_ADDRESS")
            .context("EMAIL_SENDER_ADDRESS is required when BREVO_API_KEY is set")?,
        reset_url: optional("PASSWORD_RESET_URL")
            .context("PASSWORD_RESET_URL is required when BREVO_API_KEY is set")?,
    }))
}

fn storage_from_env() -> anyhow::Result<StorageConfig> {
    let default_picture_key = optional("DEFAULT_PICTURE_KEY").unwrap_or_else(|| "nopp.png".to_string());

    let Some(bucket) = optional("S3_BUCKET") else {
        return Ok(StorageConfig {
            s3: None,
            default_picture_key,
        });
    };

    let region = optional("S3_REGION").unwrap_or_else(|| "us-east-1".to_string());
    let public_base_url = optional("S3_PUBLIC_BASE_URL")
        .unwrap_or_else(|| format!("https://{}.s3.{}.amazonaws.com", bucket, region));

    Ok(StorageConfig {
        s3: Some(S3Config {
            bucket,
            region,
            access_key_id: optional("S3_ACCESS_KEY_ID")
                .context("S3_ACCESS_KEY_ID is required when S3_BUCKET is set")?,
            secret_access_key: optional("S3_SECRET_ACCESS_KEY")
                .context("S3_SECRET_ACCESS_KEY is required when S3_BUCKET is set")?,
            endpoint: optional("S3_ENDPOINT"),
            public_base_url,
        }),
        default_picture_key,
    })
}
