/// Read access to due tasks and device tokens
///
/// The scanner and dispatcher only need two queries, so they depend on this
/// trait instead of a pool. [`PgReminderStore`] is the production
/// implementation; tests use an in-memory one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tasca_shared::models::device_token::DeviceToken;
use tasca_shared::models::task::{DueTask, Task};
use uuid::Uuid;

/// Queries used by the deadline worker
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Incomplete tasks with a deadline in `[start, end)`
    async fn due_tasks(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DueTask>, sqlx::Error>;

    /// Every push token registered by a user
    async fn device_tokens(&self, user_id: Uuid) -> Result<Vec<String>, sqlx::Error>;
}

/// PostgreSQL-backed store
#[derive(Debug, Clone)]
pub struct PgReminderStore {
    db: PgPool,
}

impl PgReminderStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReminderStore for PgReminderStore {
    async fn due_tasks(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DueTask>, sqlx::Error> {
        Task::find_open_due_between(&self.db, start, end).await
    }

    async fn device_tokens(&self, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        DeviceToken::tokens_for_user(&self.db, user_id).await
    }
}
