/// Worker configuration
///
/// Loaded from environment variables. The standalone worker cannot do
/// anything without push credentials, so they are required here.

use std::env;
use std::time::Duration;

use anyhow::{bail, Context};
use tasca_shared::db::pool::DatabaseConfig;
use tasca_shared::integrations::push::OneSignalConfig;

use crate::scheduler::DEFAULT_SCAN_INTERVAL;

/// Worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database: DatabaseConfig,
    pub push: OneSignalConfig,
    pub scan_interval: Duration,
}

impl WorkerConfig {
    /// Loads configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL`, `ONESIGNAL_APP_ID` or
    /// `ONESIGNAL_REST_API_KEY` is missing, or a number fails to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        let url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let database = DatabaseConfig {
            url,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a number")?,
            min_connections: 1,
            ..Default::default()
        };

        let push = push_config_from_env()?
            .context("ONESIGNAL_APP_ID and ONESIGNAL_REST_API_KEY must be set")?;

        Ok(Self {
            database,
            push,
            scan_interval: scan_interval_from_env()?,
        })
    }
}

/// Reads OneSignal settings; `None` when neither credential is set
///
/// # Errors
///
/// Returns an error when only one of the two credentials is set.
pub fn push_config_from_env() -> anyhow::Result<Option<OneSignalConfig>> {
    let app_id = env::var("ONESIGNAL_APP_ID").ok().filter(|v| !v.is_empty());
    let api_key = env::var("ONESIGNAL_REST_API_KEY").ok().filter(|v| !v.is_empty());

    match (app_id, api_key) {
        (Some(app_id), Some(api_key)) => {
            let mut config = OneSignalConfig::new(app_id, api_key);
            if let Ok(base_url) = env::var("ONESIGNAL_BASE_URL") {
                config.base_url = base_url;
            }
            Ok(Some(config))
        }
        (None, None) => Ok(None),
        _ => bail!("ONESIGNAL_APP_ID and ONESIGNAL_REST_API_KEY must be set together"),
    }
}

/// `SCHEDULER_INTERVAL_HOURS`, defaulting to six hours
pub fn scan_interval_from_env() -> anyhow::Result<Duration> {
    match env::var("SCHEDULER_INTERVAL_HOURS") {
        Ok(value) => {
            let hours: u64 = value
                .parse()
                .context("SCHEDULER_INTERVAL_HOURS must be a number")?;
            if hours == 0 {
                bail!("SCHEDULER_INTERVAL_HOURS must be at least 1");
            }
            Ok(Duration::from_secs(hours * 60 * 60))
        }
        Err(_) => Ok(DEFAULT_SCAN_INTERVAL),
    }
}
