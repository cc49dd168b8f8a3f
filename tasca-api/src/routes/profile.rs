/// Profile endpoints
///
/// All routes require a bearer access token.
///
/// - `GET    /v1/profile` - Current user with `picture_url`
/// - `PATCH  /v1/profile` - Multipart edit of username, name, phone and picture
/// - `DELETE /v1/profile` - Delete the account
/// - `DELETE /v1/profile/picture` - Reset to the default picture
/// - `PATCH  /v1/profile/password` - Change password
/// - `POST   /v1/profile/google/link` / `unlink`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    routes::auth::{verify_google_token, GoogleSignInRequest, MessageResponse},
};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Extension, Json,
};
use tasca_shared::{
    auth::middleware::AuthContext,
    services::{
        accounts,
        profile::{self, PasswordChange, PictureUpload, ProfileUpdate, ProfileView},
    },
};

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Invalid multipart body: {}", err))
}

/// Reads the profile form; unknown fields are ignored and an empty phone
/// clears the stored number
async fn read_profile_form(mut multipart: Multipart) -> ApiResult<ProfileUpdate> {
    let mut update = ProfileUpdate::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "username" => update.username = Some(field.text().await.map_err(multipart_error)?),
            "name" => update.name = Some(field.text().await.map_err(multipart_error)?),
            "phone" => {
                let phone = field.text().await.map_err(multipart_error)?;
                let phone = phone.trim();
                update.phone = Some((!phone.is_empty()).then(|| phone.to_string()));
            }
            "picture" => {
                let filename = field.file_name().unwrap_or("picture").to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if !bytes.is_empty() {
                    update.picture = Some(PictureUpload { filename, bytes });
                }
            }
            other => tracing::debug!(field = other, "Ignoring unknown profile field"),
        }
    }

    Ok(update)
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ProfileView>> {
    let view = profile::get_profile(&state.db, &auth, &state.assets).await?;
    Ok(Json(view))
}

/// Edits the profile
///
/// # Errors
///
/// - `409 Conflict`: Username already taken
/// - `422 Unprocessable Entity`: Invalid username, phone or picture
/// - `503 Service Unavailable`: Picture sent but no blob store configured
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    multipart: Multipart,
) -> ApiResult<Json<ProfileView>> {
    let update = read_profile_form(multipart).await?;
    let view = profile::update_profile(&state.db, &auth, &state.assets, update).await?;
    Ok(Json(view))
}

pub async fn delete_picture(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ProfileView>> {
    let view = profile::delete_picture(&state.db, &auth, &state.assets).await?;
    Ok(Json(view))
}

/// Changes the password
///
/// # Errors
///
/// - `400 Bad Request`: Google-only account
/// - `401 Unauthorized`: Wrong current password
/// - `422 Unprocessable Entity`: Weak or mismatched new password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<PasswordChange>,
) -> ApiResult<Json<MessageResponse>> {
    profile::change_password(&state.db, &auth, req).await?;

    Ok(Json(MessageResponse {
        message: "Password changed".to_string(),
    }))
}

pub async fn link_google(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<GoogleSignInRequest>,
) -> ApiResult<Json<ProfileView>> {
    let identity = verify_google_token(&state, &req.id_token).await?;
    let user = accounts::link_google(&state.db, &auth, identity).await?;
    Ok(Json(ProfileView::new(user, &state.assets)))
}

pub async fn unlink_google(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ProfileView>> {
    let user = accounts::unlink_google(&state.db, &auth).await?;
    Ok(Json(ProfileView::new(user, &state.assets)))
}

pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    profile::delete_account(&state.db, &auth, &state.assets).await?;
    Ok(StatusCode::NO_CONTENT)
}
