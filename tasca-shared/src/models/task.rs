/// Task model and database operations
///
/// A task belongs to exactly one todo and is deleted with it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     todo_id UUID NOT NULL REFERENCES todos(id) ON DELETE CASCADE,
///     title TEXT NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     priority SMALLINT NOT NULL DEFAULT 0 CHECK (priority BETWEEN 0 AND 3),
///     is_complete BOOLEAN NOT NULL DEFAULT FALSE,
///     deadline TIMESTAMPTZ NOT NULL,
///     completed_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tasca_shared::models::task::{CreateTask, Task};
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, todo_id: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     todo_id,
///     title: "Write chapter 2".to_string(),
///     description: String::new(),
///     priority: 1,
///     deadline: chrono::Utc::now() + chrono::Duration::days(1),
/// })
/// .await?;
///
/// let done = Task::set_completion(&pool, task.id, true).await?;
/// assert!(done.map(|t| t.completed_at.is_some()).unwrap_or(false));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Task row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Parent todo
    pub todo_id: Uuid,

    pub title: String,

    pub description: String,

    /// 0 (low) to 3 (urgent)
    pub priority: i16,

    pub is_complete: bool,

    pub deadline: DateTime<Utc>,

    /// Stamped when toggled to complete, cleared when reopened
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub todo_id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: i16,
    pub deadline: DateTime<Utc>,
}

/// Patch for a task
///
/// Completion goes through [`Task::set_completion`] instead.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i16>,
    pub deadline: Option<DateTime<Utc>>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.deadline.is_none()
    }
}

/// Id and title only, for the complete/incomplete pickers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskTitle {
    pub id: Uuid,
    pub title: String,
}

/// An open task with a deadline in a scan window, joined to its owner
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DueTask {
    pub task_id: Uuid,
    pub task_title: String,
    pub deadline: DateTime<Utc>,
    pub todo_id: Uuid,
    pub todo_title: String,
    pub user_id: Uuid,
}

impl Task {
    /// Inserts a task; new tasks start incomplete
    pub async fn create<'e, E>(executor: E, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (todo_id, title, description, priority, deadline)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(data.todo_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.priority)
        .bind(data.deadline)
        .fetch_one(executor)
        .await
    }

    /// Finds a task by id
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a task only if it sits under the given todo
    pub async fn find_in_todo(
        pool: &PgPool,
        todo_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1 AND todo_id = $2")
            .bind(id)
            .bind(todo_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists a todo's tasks, most urgent and soonest first
    pub async fn list_by_todo<'e, E>(executor: E, todo_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE todo_id = $1
            ORDER BY priority DESC, deadline ASC, created_at ASC
            "#,
        )
        .bind(todo_id)
        .fetch_all(executor)
        .await
    }

    /// Counts a todo's tasks: `(total, completed)`
    pub async fn counts_for_todo<'e, E>(executor: E, todo_id: Uuid) -> Result<(i64, i64), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE is_complete)
            FROM tasks
            WHERE todo_id = $1
            "#,
        )
        .bind(todo_id)
        .fetch_one(executor)
        .await
    }

    /// Lists ids and titles of a todo's tasks with the given completion state
    pub async fn list_titles(
        pool: &PgPool,
        todo_id: Uuid,
        is_complete: bool,
    ) -> Result<Vec<TaskTitle>, sqlx::Error> {
        sqlx::query_as::<_, TaskTitle>(
            r#"
            SELECT id, title FROM tasks
            WHERE todo_id = $1 AND is_complete = $2
            ORDER BY deadline ASC
            "#,
        )
        .bind(todo_id)
        .bind(is_complete)
        .fetch_all(pool)
        .await
    }

    /// Applies a patch
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE tasks SET updated_at = NOW()");

        if let Some(title) = data.title {
            query.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(priority) = data.priority {
            query.push(", priority = ").push_bind(priority);
        }
        if let Some(deadline) = data.deadline {
            query.push(", deadline = ").push_bind(deadline);
        }

        query.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        query.build_query_as::<Task>().fetch_optional(pool).await
    }

    /// Sets the completion flag and stamps or clears `completed_at`
    pub async fn set_completion<'e, E>(
        executor: E,
        id: Uuid,
        is_complete: bool,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET is_complete = $2,
                completed_at = CASE WHEN $2 THEN NOW() ELSE NULL END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(is_complete)
        .fetch_optional(executor)
        .await
    }

    /// Deletes a task
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Case-insensitive title search across all of a user's todos
    pub async fn search_for_user(
        pool: &PgPool,
        user_id: Uuid,
        query: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT k.* FROM tasks k
            JOIN todos t ON t.id = k.todo_id
            WHERE t.user_id = $1 AND k.title ILIKE $2 ESCAPE '\'
            ORDER BY k.deadline ASC
            "#,
        )
        .bind(user_id)
        .bind(like_pattern(query))
        .fetch_all(pool)
        .await
    }

    /// Lists a user's tasks with a deadline in `[start, end)`
    pub async fn list_for_user_between(
        pool: &PgPool,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT k.* FROM tasks k
            JOIN todos t ON t.id = k.todo_id
            WHERE t.user_id = $1 AND k.deadline >= $2 AND k.deadline < $3
            ORDER BY k.deadline ASC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
    }

    /// Counts all completed tasks under a user's todos
    pub async fn count_completed_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM tasks k
            JOIN todos t ON t.id = k.todo_id
            WHERE t.user_id = $1 AND k.is_complete
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Completion instants of a user's tasks completed in `[start, end)`
    pub async fn completed_between(
        pool: &PgPool,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, sqlx::Error> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            SELECT k.completed_at FROM tasks k
            JOIN todos t ON t.id = k.todo_id
            WHERE t.user_id = $1
              AND k.is_complete
              AND k.completed_at >= $2 AND k.completed_at < $3
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
    }

    /// Open tasks with a deadline in `[start, end)`, with their todo and owner
    pub async fn find_open_due_between(
        pool: &PgPool,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DueTask>, sqlx::Error> {
        sqlx::query_as::<_, DueTask>(
            r#"
            SELECT k.id AS task_id, k.title AS task_title, k.deadline,
                   t.id AS todo_id, t.title AS todo_title, t.user_id
            FROM tasks k
            JOIN todos t ON t.id = k.todo_id
            WHERE k.is_complete = FALSE
              AND k.deadline >= $1 AND k.deadline < $2
            ORDER BY k.deadline ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
    }
}

/// Builds an ILIKE pattern matching `query` anywhere, with wildcards escaped
pub fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
