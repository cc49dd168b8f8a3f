/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register new user
/// - `POST /v1/auth/login` - Login with email or username
/// - `POST /v1/auth/refresh` - Refresh access token
/// - `POST /v1/auth/google` - Sign in with a Google ID token
/// - `POST /v1/auth/password/forgot` - Email a reset link
/// - `POST /v1/auth/password/validate` - Check a reset token
/// - `POST /v1/auth/password/reset` - Set a new password with a reset token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tasca_shared::{
    auth::jwt,
    models::user::User,
    services::{
        accounts::{self, Registration, Session},
        password_reset::{self, PasswordReset, TokenCheck},
    },
};
use validator::Validate;

/// Register response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address or username
    #[validate(length(min = 1, message = "Email or username is required"))]
    pub identifier: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Google sign-in request
#[derive(Debug, Deserialize)]
pub struct GoogleSignInRequest {
    pub id_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateTokenRequest {
    pub token: String,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "username": "johndoe",
///   "name": "John Doe",
///   "email": "user@example.com",
///   "phone": "+628123456789",
///   "password": "SecurePass1",
///   "confirm_password": "SecurePass1"
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Username or email already exists
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<Registration>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let user = accounts::register(&state.db, req).await?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user })))
}

/// Login endpoint
///
/// Authenticates a user by email or username and returns JWT tokens plus the
/// user record.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials or a Google-only account
/// - `422 Unprocessable Entity`: Blank fields
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<Session>> {
    req.validate()?;

    let user = accounts::authenticate(&state.db, &req.identifier, &req.password).await?;
    let session = accounts::open_session(user, state.jwt_secret(), state.token_lifetimes())?;

    Ok(Json(session))
}

/// Token refresh endpoint
///
/// Exchanges a refresh token for a new access token.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token, or an access token
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let lifetimes = state.token_lifetimes();
    let access_token =
        jwt::refresh_access_token(&req.refresh_token, state.jwt_secret(), lifetimes.access)?;

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: lifetimes.access.num_seconds(),
    }))
}

/// Google sign-in
///
/// Verifies the ID token, then logs in the linked account or creates a new
/// Google-only account.
///
/// # Errors
///
/// - `401 Unauthorized`: Token rejected by Google
/// - `409 Conflict`: Email belongs to an unlinked local account
/// - `503 Service Unavailable`: Google sign-in is not configured
pub async fn google_sign_in(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GoogleSignInRequest>,
) -> ApiResult<Json<Session>> {
    let identity = verify_google_token(&state, &req.id_token).await?;

    let user = accounts::sign_in_with_google(&state.db, identity).await?;
    let session = accounts::open_session(user, state.jwt_secret(), state.token_lifetimes())?;

    Ok(Json(session))
}

/// Verifies a Google ID token with the configured verifier
pub(crate) async fn verify_google_token(
    state: &AppState,
    id_token: &str,
) -> ApiResult<tasca_shared::integrations::google::GoogleIdentity> {
    use tasca_shared::integrations::google::IdentityError;

    let verifier = state
        .google
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Google sign-in is not configured".to_string()))?;

    verifier.verify(id_token).await.map_err(|e| match e {
        IdentityError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        IdentityError::Transport(err) => ApiError::BadGateway(format!("Google tokeninfo: {}", err)),
    })
}

/// Starts a password reset
///
/// # Errors
///
/// - `404 Not Found`: No account uses this email
/// - `409 Conflict`: A reset link is still valid
/// - `503 Service Unavailable`: Email delivery is not configured
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    password_reset::request_password_reset(&state.db, state.mailer.as_ref(), &req.email).await?;

    Ok(Json(MessageResponse {
        message: "Password reset link sent".to_string(),
    }))
}

/// Checks a reset token
///
/// # Errors
///
/// - `400 Bad Request`: Unknown or expired token
pub async fn validate_reset_token(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ValidateTokenRequest>,
) -> ApiResult<Json<TokenCheck>> {
    let check = password_reset::validate_reset_token(&state.db, &req.token).await?;
    Ok(Json(check))
}

/// Sets a new password with a reset token
///
/// # Errors
///
/// - `400 Bad Request`: Unknown or expired token
/// - `422 Unprocessable Entity`: Weak or mismatched password
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PasswordReset>,
) -> ApiResult<Json<MessageResponse>> {
    password_reset::reset_password(&state.db, req).await?;

    Ok(Json(MessageResponse {
        message: "Password has been reset".to_string(),
    }))
}
