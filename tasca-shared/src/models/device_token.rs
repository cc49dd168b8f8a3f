/// Push-notification device tokens
///
/// A token is unique per user. Registering it again only updates the
/// platform, so a user's device count never grows from re-registration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Registered device
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceToken {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Opaque push-gateway identifier
    pub token: String,
    /// e.g. `android`, `ios`, `web`
    pub platform: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeviceToken {
    /// Registers a token, or updates its platform if already registered
    pub async fn upsert(
        pool: &PgPool,
        user_id: Uuid,
        token: &str,
        platform: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, DeviceToken>(
            r#"
            INSERT INTO device_tokens (user_id, token, platform)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, token)
            DO UPDATE SET platform = EXCLUDED.platform, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(platform)
        .fetch_one(pool)
        .await
    }

    /// Removes one of the user's tokens
    ///
    /// # Returns
    ///
    /// False if the user had no such token
    pub async fn delete(pool: &PgPool, user_id: Uuid, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM device_tokens WHERE user_id = $1 AND token = $2")
            .bind(user_id)
            .bind(token)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the user's devices, most recently registered first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, DeviceToken>(
            "SELECT * FROM device_tokens WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Token strings only, for push fan-out
    pub async fn tokens_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT token FROM device_tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Number of devices a user has registered
    pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM device_tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }
}
