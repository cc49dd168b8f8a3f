//! Error type for the domain services
//!
//! Services return [`ServiceError`]; the API layer maps each variant to an
//! HTTP status. Gateway failures are wrapped as `Upstream` so the caller
//! decides whether to surface or swallow them.

use crate::auth::authorization::AuthzError;
use crate::auth::password::PasswordError;
use crate::db::pool::unique_violation;

/// Domain service error
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed input on a named field
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// Bad request that is not tied to one field
    #[error("{0}")]
    BadRequest(String),

    /// Wrong credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Caller does not own the resource
    #[error("{0}")]
    Forbidden(String),

    /// Entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// Duplicate username/email, already-linked identity, pending reset
    #[error("{0}")]
    Conflict(String),

    /// Optional collaborator is not configured
    #[error("{0} is not configured")]
    Unavailable(&'static str),

    /// Push, email, blob or identity gateway failed
    #[error("{service} failed: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    /// Password hashing failure
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Database failure
    #[error(transparent)]
    Database(sqlx::Error),
}

/// Convenience alias
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn upstream(service: &'static str, err: impl std::fmt::Display) -> Self {
        ServiceError::Upstream {
            service,
            message: err.to_string(),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(constraint) = unique_violation(&err) {
            let message = if constraint.contains("username") {
                "Username is already taken"
            } else if constraint.contains("email") {
                "Email is already registered"
            } else if constraint.contains("google") {
                "This Google account is already linked to another user"
            } else {
                "Resource already exists"
            };
            return ServiceError::Conflict(message.to_string());
        }

        match err {
            sqlx::Error::RowNotFound => ServiceError::NotFound("Resource not found".to_string()),
            other => ServiceError::Database(other),
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotOwner => ServiceError::Forbidden(err.to_string()),
            AuthzError::TodoNotFound(_) | AuthzError::TaskNotFound(_) => {
                ServiceError::NotFound(err.to_string())
            }
            AuthzError::DatabaseError(e) => ServiceError::from(e),
        }
    }
}
