//! Task operations
//!
//! Every operation first checks that the caller owns the parent todo.
//! Changes that affect completion (create, toggle, delete) refresh the
//! todo's persisted `is_complete` in the same transaction.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{require_title, resolve_priority};
use crate::auth::authorization::{require_owned_task, require_todo_owner};
use crate::auth::middleware::AuthContext;
use crate::calendar::{self, DAYS_PER_WEEK};
use crate::error::{ServiceError, ServiceResult};
use crate::models::task::{CreateTask, Task, TaskTitle, UpdateTask};
use crate::models::todo::Todo;
use crate::progress::Progress;

/// Input for a new task
#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    pub deadline: DateTime<Utc>,
}

/// Patch for a task as sent by clients
///
/// Completion goes through [`set_task_completion`] instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i64>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Result of a completion toggle
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub task: Task,
    /// False when the task already had the requested state
    pub changed: bool,
    pub todo_is_complete: bool,
    pub progress: i32,
}

/// Completed-task counts for the current week
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyTaskStats {
    /// All completed tasks the user ever had
    pub total_tasks: i64,
    /// Tasks completed on each day, Monday first
    pub daily_tasks: [i64; DAYS_PER_WEEK],
    pub week_start: NaiveDate,
}

/// The state to write for a toggle, or `None` when nothing changes
pub fn completion_change(current: bool, requested: bool) -> Option<bool> {
    (current != requested).then_some(requested)
}

/// Recomputes a todo's derived flag inside a transaction
async fn refresh_todo_completion(conn: &mut PgConnection, todo_id: Uuid) -> ServiceResult<Progress> {
    let (total, completed) = Task::counts_for_todo(&mut *conn, todo_id).await?;
    let progress = Progress::from_counts(total, completed);

    Todo::set_completion(&mut *conn, todo_id, progress.is_complete).await?;

    Ok(progress)
}

/// Lists all tasks under one of the caller's todos
pub async fn list_tasks(pool: &PgPool, auth: &AuthContext, todo_id: Uuid) -> ServiceResult<Vec<Task>> {
    require_todo_owner(pool, auth, todo_id).await?;
    Ok(Task::list_by_todo(pool, todo_id).await?)
}

/// Ids and titles of a todo's complete or incomplete tasks
pub async fn list_task_titles(
    pool: &PgPool,
    auth: &AuthContext,
    todo_id: Uuid,
    is_complete: bool,
) -> ServiceResult<Vec<TaskTitle>> {
    require_todo_owner(pool, auth, todo_id).await?;
    Ok(Task::list_titles(pool, todo_id, is_complete).await?)
}

/// Loads one task
pub async fn get_task(
    pool: &PgPool,
    auth: &AuthContext,
    todo_id: Uuid,
    task_id: Uuid,
) -> ServiceResult<Task> {
    let (_, task) = require_owned_task(pool, auth, todo_id, task_id).await?;
    Ok(task)
}

/// Creates a task; a complete todo becomes incomplete again
pub async fn create_task(
    pool: &PgPool,
    auth: &AuthContext,
    todo_id: Uuid,
    input: NewTask,
) -> ServiceResult<Task> {
    require_todo_owner(pool, auth, todo_id).await?;

    let data = CreateTask {
        todo_id,
        title: require_title("title", &input.title)?,
        description: input.description.unwrap_or_default().trim().to_string(),
        priority: resolve_priority(input.priority)?,
        deadline: input.deadline,
    };

    let mut tx = pool.begin().await?;
    let task = Task::create(&mut *tx, data).await?;
    refresh_todo_completion(&mut *tx, todo_id).await?;
    tx.commit().await?;

    tracing::info!(user_id = %auth.user_id, todo_id = %todo_id, task_id = %task.id, "Task created");
    Ok(task)
}

/// Patches a task's title, description, priority or deadline
pub async fn update_task(
    pool: &PgPool,
    auth: &AuthContext,
    todo_id: Uuid,
    task_id: Uuid,
    patch: TaskPatch,
) -> ServiceResult<Task> {
    require_owned_task(pool, auth, todo_id, task_id).await?;

    let patch = UpdateTask {
        title: patch.title.map(|t| require_title("title", &t)).transpose()?,
        description: patch.description.map(|d| d.trim().to_string()),
        priority: patch.priority.map(|p| resolve_priority(Some(p))).transpose()?,
        deadline: patch.deadline,
    };

    Task::update(pool, task_id, patch)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Task not found".to_string()))
}

/// Sets a task's completion state
///
/// Requesting the state the task already has performs no writes.
/// Otherwise the flag and the parent's derived completion are written in
/// one transaction.
pub async fn set_task_completion(
    pool: &PgPool,
    auth: &AuthContext,
    todo_id: Uuid,
    task_id: Uuid,
    requested: bool,
) -> ServiceResult<CompletionOutcome> {
    let (todo, task) = require_owned_task(pool, auth, todo_id, task_id).await?;

    let Some(target) = completion_change(task.is_complete, requested) else {
        let (total, completed) = Task::counts_for_todo(pool, todo_id).await?;
        let progress = Progress::from_counts(total, completed);

        return Ok(CompletionOutcome {
            task,
            changed: false,
            todo_is_complete: todo.is_complete,
            progress: progress.progress,
        });
    };

    let mut tx = pool.begin().await?;
    let task = Task::set_completion(&mut *tx, task_id, target)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Task not found".to_string()))?;
    let progress = refresh_todo_completion(&mut *tx, todo_id).await?;
    tx.commit().await?;

    tracing::debug!(
        task_id = %task_id,
        is_complete = target,
        progress = progress.progress,
        "Task completion changed"
    );

    Ok(CompletionOutcome {
        task,
        changed: true,
        todo_is_complete: progress.is_complete,
        progress: progress.progress,
    })
}

/// Deletes a task and refreshes the parent's completion
pub async fn delete_task(
    pool: &PgPool,
    auth: &AuthContext,
    todo_id: Uuid,
    task_id: Uuid,
) -> ServiceResult<()> {
    require_owned_task(pool, auth, todo_id, task_id).await?;

    let mut tx = pool.begin().await?;
    if !Task::delete(&mut *tx, task_id).await? {
        return Err(ServiceError::NotFound("Task not found".to_string()));
    }
    refresh_todo_completion(&mut *tx, todo_id).await?;
    tx.commit().await?;

    Ok(())
}

/// Title search across all of the caller's todos
pub async fn search_tasks(pool: &PgPool, auth: &AuthContext, query: &str) -> ServiceResult<Vec<Task>> {
    if query.trim().is_empty() {
        return Err(ServiceError::BadRequest("Search query is required".to_string()));
    }

    Ok(Task::search_for_user(pool, auth.user_id, query).await?)
}

/// The caller's tasks due on a local calendar day
pub async fn tasks_on_day<Tz: TimeZone>(
    pool: &PgPool,
    auth: &AuthContext,
    tz: &Tz,
    day: NaiveDate,
) -> ServiceResult<Vec<Task>> {
    let (start, end) = calendar::day_bounds(tz, day);
    Ok(Task::list_for_user_between(pool, auth.user_id, start, end).await?)
}

/// Completed tasks per weekday of the week containing `today`
///
/// Tasks are bucketed by the local day of `completed_at`.
pub async fn weekly_task_stats<Tz: TimeZone>(
    pool: &PgPool,
    auth: &AuthContext,
    tz: &Tz,
    today: NaiveDate,
) -> ServiceResult<WeeklyTaskStats> {
    let week_start = calendar::week_start(today);
    let (start, end) = calendar::week_bounds(tz, today);

    let total_tasks = Task::count_completed_for_user(pool, auth.user_id).await?;
    let completions = Task::completed_between(pool, auth.user_id, start, end).await?;

    Ok(WeeklyTaskStats {
        total_tasks,
        daily_tasks: calendar::bucket_by_weekday(tz, week_start, completions),
        week_start,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_change_is_noop_for_same_state() {
        assert_eq!(completion_change(true, true), None);
        assert_eq!(completion_change(false, false), None);
    }

    #[test]
    fn test_completion_change_flips() {
        assert_eq!(completion_change(false, true), Some(true));
        assert_eq!(completion_change(true, false), Some(false));
    }

    #[test]
    fn test_new_task_defaults() {
        let input: NewTask =
            serde_json::from_str(r#"{"title": "Read", "deadline": "2024-01-15T09:00:00Z"}"#).unwrap();

        assert!(input.description.is_none());
        assert!(input.priority.is_none());
    }

    #[test]
    fn test_task_patch_ignores_completion() {
        let patch: TaskPatch = serde_json::from_str(
            r#"{"deadline": "2024-01-15T09:00:00Z", "priority": 40000, "is_complete": true}"#,
        )
        .unwrap();

        assert!(patch.title.is_none());
        assert_eq!(patch.priority, Some(40_000));
        assert_eq!(patch.deadline.unwrap().to_rfc3339(), "2024-01-15T09:00:00+00:00");
    }
}
