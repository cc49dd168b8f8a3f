//! HTTP-level tests that never reach the database
//!
//! The router runs over a lazy pool pointing at an unreachable server, so
//! every assertion here covers authentication, request parsing or
//! validation that happens before any query.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use common::{access_token, offline_app, offline_state, refresh_token, send};
use serde_json::json;
use tasca_api::app::build_router;
use tasca_shared::integrations::google::{GoogleIdentity, IdentityError, IdentityVerifier};
use uuid::Uuid;

struct RejectingVerifier;

#[async_trait]
impl IdentityVerifier for RejectingVerifier {
    async fn verify(&self, _id_token: &str) -> Result<GoogleIdentity, IdentityError> {
        Err(IdentityError::InvalidToken("audience mismatch".to_string()))
    }
}

#[tokio::test]
async fn test_health_reports_degraded_without_database() {
    let app = offline_app();

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "disconnected");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = offline_app();

    for uri in ["/v1/todos", "/v1/profile", "/v1/devices", "/v1/pomodoro/weekly"] {
        let (status, body) = send(&app, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_malformed_and_forged_tokens_are_rejected() {
    let app = offline_app();

    let (status, _) = send(&app, Method::GET, "/v1/todos", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let other_secret = tasca_shared::auth::jwt::create_token(
        &tasca_shared::auth::jwt::Claims::new(
            Uuid::new_v4(),
            tasca_shared::auth::jwt::TokenType::Access,
        ),
        "a-completely-different-secret-value",
    )
    .unwrap();
    let (status, _) = send(&app, Method::GET, "/v1/todos", Some(&other_secret), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_cannot_access_api() {
    let app = offline_app();
    let token = refresh_token(Uuid::new_v4());

    let (status, _) = send(&app, Method::GET, "/v1/todos", Some(&token), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_issues_access_token() {
    let app = offline_app();
    let user_id = Uuid::new_v4();

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/refresh",
        None,
        Some(json!({ "refresh_token": refresh_token(user_id) })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");

    let access = body["access_token"].as_str().unwrap();
    let claims = tasca_shared::auth::jwt::validate_access_token(access, common::TEST_SECRET).unwrap();
    assert_eq!(claims.sub, user_id);
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let app = offline_app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/auth/refresh",
        None,
        Some(json!({ "refresh_token": access_token(Uuid::new_v4()) })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rejects_weak_password() {
    let app = offline_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/register",
        None,
        Some(json!({
            "username": "johndoe",
            "name": "John Doe",
            "email": "john@example.com",
            "password": "weak",
            "confirm_password": "weak"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "password");
}

#[tokio::test]
async fn test_register_rejects_mismatched_confirmation() {
    let app = offline_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/register",
        None,
        Some(json!({
            "username": "johndoe",
            "name": "John Doe",
            "email": "john@example.com",
            "password": "SecurePass1",
            "confirm_password": "SecurePass2"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "confirm_password");
}

#[tokio::test]
async fn test_login_requires_identifier() {
    let app = offline_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/login",
        None,
        Some(json!({ "identifier": "", "password": "whatever" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "identifier");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = offline_app();

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/v1/auth/login")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_google_sign_in_unconfigured() {
    let app = offline_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/google",
        None,
        Some(json!({ "id_token": "abc" })),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "service_unavailable");
}

#[tokio::test]
async fn test_google_sign_in_rejected_token() {
    let state = offline_state().with_identity_verifier(Arc::new(RejectingVerifier));
    let app = build_router(state);

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/auth/google",
        None,
        Some(json!({ "id_token": "abc" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forgot_password_without_mailer() {
    let app = offline_app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/auth/password/forgot",
        None,
        Some(json!({ "email": "someone@example.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_forgot_password_validates_email() {
    let app = offline_app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/auth/password/forgot",
        None,
        Some(json!({ "email": "not-an-email" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_reset_token_must_not_be_blank() {
    let app = offline_app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/auth/password/validate",
        None,
        Some(json!({ "token": "  " })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_requires_query() {
    let app = offline_app();
    let token = access_token(Uuid::new_v4());

    let (status, body) = send(&app, Method::GET, "/v1/tasks/search?q=", Some(&token), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_invalid_dates_are_bad_requests() {
    let app = offline_app();
    let token = access_token(Uuid::new_v4());

    let (status, _) = send(&app, Method::GET, "/v1/tasks/by-date/2024-13-01", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/v1/pomodoro/daily?date=yesterday", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_todo_id_is_bad_request() {
    let app = offline_app();
    let token = access_token(Uuid::new_v4());

    let (status, body) = send(&app, Method::GET, "/v1/todos/not-a-uuid", Some(&token), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_pomodoro_rejects_empty_session() {
    let app = offline_app();
    let token = access_token(Uuid::new_v4());

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/pomodoro/complete",
        Some(&token),
        Some(json!({ "duration": 0, "completed_at": "2024-05-01T10:00:00Z" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "duration");
}

#[tokio::test]
async fn test_pomodoro_rejects_session_longer_than_a_day() {
    let app = offline_app();
    let token = access_token(Uuid::new_v4());

    for duration in [json!(1441), json!(i32::MAX), json!(i64::MAX)] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/pomodoro/complete",
            Some(&token),
            Some(json!({ "duration": duration, "completed_at": "2024-05-01T10:00:00Z" })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "duration {}", duration);
        assert_eq!(body["details"][0]["field"], "duration");
    }
}

#[tokio::test]
async fn test_create_todo_rejects_priority_wider_than_column() {
    let app = offline_app();
    let token = access_token(Uuid::new_v4());

    for priority in [4, 40_000, -40_000] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/todos",
            Some(&token),
            Some(json!({ "title": "Urgent", "priority": priority })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "priority {}", priority);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["details"][0]["field"], "priority");
    }
}

#[tokio::test]
async fn test_security_headers_on_api_responses() {
    let app = offline_app();

    let request = axum::http::Request::builder()
        .uri("/v1/todos")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();

    assert_eq!(response.headers().get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");
}
