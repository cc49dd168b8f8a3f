/// Pomodoro focus tracking
///
/// Sessions are bucketed by the server-local day of their completion time.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiQuery},
};
use axum::{extract::State, Extension, Json};
use chrono::Local;
use serde::Deserialize;
use tasca_shared::{
    auth::middleware::AuthContext,
    calendar,
    services::pomodoro::{self, CompletedSession, DailyFocus, SessionRecorded, WeeklyFocus},
};

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    /// `YYYY-MM-DD`; today when absent
    pub date: Option<String>,
}

/// Records a finished session
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Duration below one minute or above one day
pub async fn complete_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(session): ApiJson<CompletedSession>,
) -> ApiResult<Json<SessionRecorded>> {
    let recorded = pomodoro::complete_session(&state.db, &auth, &Local, session).await?;
    Ok(Json(recorded))
}

pub async fn daily_focus(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiQuery(query): ApiQuery<DailyQuery>,
) -> ApiResult<Json<DailyFocus>> {
    let day = match query.date.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(date) => calendar::parse_day(date).map_err(ApiError::BadRequest)?,
        None => Local::now().date_naive(),
    };

    Ok(Json(pomodoro::daily_focus(&state.db, &auth, day).await?))
}

/// Focus minutes for each day of the current Monday-start week
pub async fn weekly_focus(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<WeeklyFocus>> {
    let today = Local::now().date_naive();
    Ok(Json(pomodoro::weekly_focus(&state.db, &auth, today).await?))
}
