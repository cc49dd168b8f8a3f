/// Todo endpoints
///
/// Every route is scoped to the authenticated user. A todo owned by someone
/// else answers 403, a missing one 404.

use crate::{app::AppState, error::ApiResult, extract::{ApiJson, ApiPath}};
use axum::{extract::State, http::StatusCode, Extension, Json};
use tasca_shared::{
    auth::middleware::AuthContext,
    models::todo::TodoSummary,
    services::todos::{self, NewTodo, TodoDetail, TodoPatch},
};
use uuid::Uuid;

/// Lists the caller's todos, newest first, with task counts and progress
pub async fn list_todos(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<TodoSummary>>> {
    Ok(Json(todos::list_todos(&state.db, &auth).await?))
}

/// Creates a todo
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Blank title or priority outside 0..=3
pub async fn create_todo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<NewTodo>,
) -> ApiResult<(StatusCode, Json<TodoDetail>)> {
    let todo = todos::create_todo(&state.db, &auth, req).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

/// Returns a todo with its tasks and computed progress
pub async fn get_todo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<TodoDetail>> {
    Ok(Json(todos::get_todo(&state.db, &auth, id).await?))
}

pub async fn update_todo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<TodoPatch>,
) -> ApiResult<Json<TodoDetail>> {
    Ok(Json(todos::update_todo(&state.db, &auth, id, patch).await?))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    todos::delete_todo(&state.db, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
