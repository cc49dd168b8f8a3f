/// Pomodoro focus time, one row per user per calendar day
///
/// Completing a session adds its minutes to the day's row, creating the row
/// on first use (`INSERT .. ON CONFLICT (user_id, day) DO UPDATE`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Daily focus total
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Pomodoro {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Server-local calendar day
    pub day: NaiveDate,
    /// Accumulated focus minutes
    pub duration: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pomodoro {
    /// Adds `minutes` to the user's total for `day`
    ///
    /// # Returns
    ///
    /// The row after the upsert, holding the new daily total
    pub async fn add_minutes(
        pool: &PgPool,
        user_id: Uuid,
        day: NaiveDate,
        minutes: i32,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Pomodoro>(
            r#"
            INSERT INTO pomodoros (user_id, day, duration)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, day)
            DO UPDATE SET duration = pomodoros.duration + EXCLUDED.duration,
                          updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(day)
        .bind(minutes)
        .fetch_one(pool)
        .await
    }

    /// Focus minutes on one day, 0 when nothing was recorded
    pub async fn minutes_on(pool: &PgPool, user_id: Uuid, day: NaiveDate) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(duration), 0)::BIGINT FROM pomodoros WHERE user_id = $1 AND day = $2",
        )
        .bind(user_id)
        .bind(day)
        .fetch_one(pool)
        .await
    }

    /// Rows for days in `[start, end)`
    pub async fn list_between(
        pool: &PgPool,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Pomodoro>(
            r#"
            SELECT * FROM pomodoros
            WHERE user_id = $1 AND day >= $2 AND day < $3
            ORDER BY day ASC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
    }
}
