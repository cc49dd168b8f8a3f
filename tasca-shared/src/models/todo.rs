/// Todo model and database operations
///
/// A todo belongs to exactly one user and groups tasks. `is_complete` is a
/// persisted copy of the derived state so list queries stay cheap; progress
/// is always recomputed from tasks (see [`crate::progress`]).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE todos (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title TEXT NOT NULL,
///     priority SMALLINT NOT NULL DEFAULT 0 CHECK (priority BETWEEN 0 AND 3),
///     is_complete BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::progress::Progress;

/// Todo row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Todo {
    pub id: Uuid,

    /// Owner
    pub user_id: Uuid,

    pub title: String,

    /// 0 (low) to 3 (urgent)
    pub priority: i16,

    /// Persisted derived flag, refreshed on task changes
    pub is_complete: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a todo
#[derive(Debug, Clone)]
pub struct CreateTodo {
    pub user_id: Uuid,
    pub title: String,
    pub priority: i16,
}

/// Patch for a todo
///
/// Completion is derived from tasks and deliberately not patchable.
#[derive(Debug, Clone, Default)]
pub struct UpdateTodo {
    pub title: Option<String>,
    pub priority: Option<i16>,
}

impl UpdateTodo {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.priority.is_none()
    }
}

/// Todo with task counts, as returned by the list query
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TodoCounts {
    pub id: Uuid,
    pub title: String,
    pub priority: i16,
    pub created_at: DateTime<Utc>,
    pub task_count: i64,
    pub completed_count: i64,
}

/// Entry of the todo list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoSummary {
    pub id: Uuid,
    pub title: String,
    pub priority: i16,
    pub task_count: i64,
    pub progress: i32,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
}

impl From<TodoCounts> for TodoSummary {
    fn from(row: TodoCounts) -> Self {
        let progress = Progress::from_counts(row.task_count, row.completed_count);

        Self {
            id: row.id,
            title: row.title,
            priority: row.priority,
            task_count: row.task_count,
            progress: progress.progress,
            is_complete: progress.is_complete,
            created_at: row.created_at,
        }
    }
}

impl Todo {
    /// Inserts a todo; new todos start incomplete
    pub async fn create(pool: &PgPool, data: CreateTodo) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Todo>(
            r#"
            INSERT INTO todos (user_id, title, priority)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(data.title)
        .bind(data.priority)
        .fetch_one(pool)
        .await
    }

    /// Finds a todo by id, whoever owns it
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Todo>("SELECT * FROM todos WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists a user's todos with task counts, newest first
    pub async fn list_with_counts(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<TodoCounts>, sqlx::Error> {
        sqlx::query_as::<_, TodoCounts>(
            r#"
            SELECT t.id, t.title, t.priority, t.created_at,
                   COUNT(k.id) AS task_count,
                   COUNT(k.id) FILTER (WHERE k.is_complete) AS completed_count
            FROM todos t
            LEFT JOIN tasks k ON k.todo_id = t.id
            WHERE t.user_id = $1
            GROUP BY t.id
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Applies a patch
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTodo,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE todos SET updated_at = NOW()");

        if let Some(title) = data.title {
            query.push(", title = ").push_bind(title);
        }
        if let Some(priority) = data.priority {
            query.push(", priority = ").push_bind(priority);
        }

        query.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        query.build_query_as::<Todo>().fetch_optional(pool).await
    }

    /// Writes the derived completion flag
    ///
    /// Only touches the row when the flag actually changes.
    pub async fn set_completion<'e, E>(
        executor: E,
        id: Uuid,
        is_complete: bool,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE todos
            SET is_complete = $2, updated_at = NOW()
            WHERE id = $1 AND is_complete <> $2
            "#,
        )
        .bind(id)
        .bind(is_complete)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a todo; its tasks cascade
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM todos WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
