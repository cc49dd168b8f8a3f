//! Todo operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{require_title, resolve_priority};
use crate::auth::authorization::require_todo_owner;
use crate::auth::middleware::AuthContext;
use crate::error::{ServiceError, ServiceResult};
use crate::models::task::Task;
use crate::models::todo::{CreateTodo, Todo, TodoSummary, UpdateTodo};
use crate::progress::Progress;

/// Input for a new todo
#[derive(Debug, Clone, Deserialize)]
pub struct NewTodo {
    pub title: String,
    pub priority: Option<i64>,
}

/// Patch for a todo as sent by clients
///
/// Completion fields are ignored; they are derived from tasks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub priority: Option<i64>,
}

/// A todo with its tasks and derived progress
#[derive(Debug, Clone, Serialize)]
pub struct TodoDetail {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub priority: i16,
    pub is_complete: bool,
    pub progress: i32,
    pub tasks: Vec<Task>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TodoDetail {
    /// Assembles the view, deriving progress from `tasks`
    pub fn new(todo: Todo, tasks: Vec<Task>) -> Self {
        let progress = Progress::from_completions(tasks.iter().map(|t| t.is_complete));

        Self {
            id: todo.id,
            user_id: todo.user_id,
            title: todo.title,
            priority: todo.priority,
            is_complete: progress.is_complete,
            progress: progress.progress,
            tasks,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}

/// Lists the caller's todos with counts and progress
pub async fn list_todos(pool: &PgPool, auth: &AuthContext) -> ServiceResult<Vec<TodoSummary>> {
    let rows = Todo::list_with_counts(pool, auth.user_id).await?;
    Ok(rows.into_iter().map(TodoSummary::from).collect())
}

/// Loads one of the caller's todos with its tasks
pub async fn get_todo(pool: &PgPool, auth: &AuthContext, todo_id: Uuid) -> ServiceResult<TodoDetail> {
    let todo = require_todo_owner(pool, auth, todo_id).await?;
    let tasks = Task::list_by_todo(pool, todo.id).await?;

    Ok(TodoDetail::new(todo, tasks))
}

/// Creates a todo for the caller
pub async fn create_todo(pool: &PgPool, auth: &AuthContext, input: NewTodo) -> ServiceResult<TodoDetail> {
    let title = require_title("title", &input.title)?;
    let priority = resolve_priority(input.priority)?;

    let todo = Todo::create(
        pool,
        CreateTodo {
            user_id: auth.user_id,
            title,
            priority,
        },
    )
    .await?;

    tracing::info!(user_id = %auth.user_id, todo_id = %todo.id, "Todo created");
    Ok(TodoDetail::new(todo, Vec::new()))
}

/// Patches title and/or priority
pub async fn update_todo(
    pool: &PgPool,
    auth: &AuthContext,
    todo_id: Uuid,
    patch: TodoPatch,
) -> ServiceResult<TodoDetail> {
    require_todo_owner(pool, auth, todo_id).await?;

    let patch = UpdateTodo {
        title: patch.title.map(|t| require_title("title", &t)).transpose()?,
        priority: patch.priority.map(|p| resolve_priority(Some(p))).transpose()?,
    };

    let todo = Todo::update(pool, todo_id, patch)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Todo not found".to_string()))?;
    let tasks = Task::list_by_todo(pool, todo.id).await?;

    Ok(TodoDetail::new(todo, tasks))
}

/// Deletes a todo and, by cascade, its tasks
pub async fn delete_todo(pool: &PgPool, auth: &AuthContext, todo_id: Uuid) -> ServiceResult<()> {
    require_todo_owner(pool, auth, todo_id).await?;

    if !Todo::delete(pool, todo_id).await? {
        return Err(ServiceError::NotFound("Todo not found".to_string()));
    }

    tracing::info!(user_id = %auth.user_id, todo_id = %todo_id, "Todo deleted");
    Ok(())
}
