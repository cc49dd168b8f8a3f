/// Device token registration for push notifications

use crate::{app::AppState, error::ApiResult, extract::ApiJson};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use tasca_shared::{
    auth::middleware::AuthContext,
    models::device_token::DeviceToken,
    services::devices::{self, DeviceRegistration},
};

#[derive(Debug, Deserialize)]
pub struct UnregisterRequest {
    pub token: String,
}

/// Registers a device token; re-registering updates the platform in place
pub async fn register_device(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<DeviceRegistration>,
) -> ApiResult<(StatusCode, Json<DeviceToken>)> {
    let device = devices::register_device(&state.db, &auth, req).await?;
    Ok((StatusCode::CREATED, Json(device)))
}

pub async fn unregister_device(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<UnregisterRequest>,
) -> ApiResult<StatusCode> {
    devices::unregister_device(&state.db, &auth, &req.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_devices(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<DeviceToken>>> {
    Ok(Json(devices::list_devices(&state.db, &auth).await?))
}
