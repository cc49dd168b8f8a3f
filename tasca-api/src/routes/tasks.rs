/// Task endpoints
///
/// Tasks nested under a todo (`/v1/todos/:id/tasks/...`) go through the
/// todo ownership check first. The cross-todo queries under `/v1/tasks`
/// only ever see the caller's own tasks.
///
/// Day and week boundaries are computed in the server's local time zone.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tasca_shared::{
    auth::middleware::AuthContext,
    calendar,
    models::task::{Task, TaskTitle},
    services::tasks::{self, NewTask, TaskPatch, WeeklyTaskStats},
};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CompletionRequest {
    pub is_complete: bool,
}

/// Completion toggle response
#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub task: Task,
    /// Persisted completion flag of the parent todo after the toggle
    pub todo_is_complete: bool,
    pub progress: i32,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(todo_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(tasks::list_tasks(&state.db, &auth, todo_id).await?))
}

pub async fn list_incomplete_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(todo_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<TaskTitle>>> {
    Ok(Json(tasks::list_task_titles(&state.db, &auth, todo_id, false).await?))
}

pub async fn list_complete_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(todo_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<TaskTitle>>> {
    Ok(Json(tasks::list_task_titles(&state.db, &auth, todo_id, true).await?))
}

/// Creates a task under a todo
///
/// # Errors
///
/// - `403 Forbidden`: Todo belongs to another user
/// - `404 Not Found`: Todo does not exist
/// - `422 Unprocessable Entity`: Blank title or priority outside 0..=3
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(todo_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<NewTask>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = tasks::create_task(&state.db, &auth, todo_id, req).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((todo_id, task_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Task>> {
    Ok(Json(tasks::get_task(&state.db, &auth, todo_id, task_id).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((todo_id, task_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(patch): ApiJson<TaskPatch>,
) -> ApiResult<Json<Task>> {
    Ok(Json(tasks::update_task(&state.db, &auth, todo_id, task_id, patch).await?))
}

/// Marks a task complete or incomplete
///
/// Requesting the state the task already has changes nothing and returns
/// the current values.
pub async fn set_task_completion(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((todo_id, task_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(req): ApiJson<CompletionRequest>,
) -> ApiResult<Json<CompletionResponse>> {
    let outcome =
        tasks::set_task_completion(&state.db, &auth, todo_id, task_id, req.is_complete).await?;

    Ok(Json(CompletionResponse {
        task: outcome.task,
        todo_is_complete: outcome.todo_is_complete,
        progress: outcome.progress,
    }))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((todo_id, task_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    tasks::delete_task(&state.db, &auth, todo_id, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Case-insensitive title search across the caller's tasks
pub async fn search_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(tasks::search_tasks(&state.db, &auth, &query.q).await?))
}

/// Tasks whose deadline falls on the given local day
pub async fn tasks_by_date(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(date): ApiPath<String>,
) -> ApiResult<Json<Vec<Task>>> {
    let day = calendar::parse_day(&date).map_err(ApiError::BadRequest)?;
    Ok(Json(tasks::tasks_on_day(&state.db, &auth, &Local, day).await?))
}

/// Completed tasks per day of the current week
pub async fn weekly_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<WeeklyTaskStats>> {
    let today = Local::now().date_naive();
    Ok(Json(tasks::weekly_task_stats(&state.db, &auth, &Local, today).await?))
}
