//! Domain services
//!
//! Services validate input, enforce ownership and orchestrate model calls
//! and gateways. HTTP handlers stay thin: parse, call a service, serialize.
//!
//! Every function returns [`crate::error::ServiceResult`].

pub mod accounts;
pub mod devices;
pub mod password_reset;
pub mod pomodoro;
pub mod profile;
pub mod tasks;
pub mod todos;

use crate::error::{ServiceError, ServiceResult};
use crate::models::check_priority;

/// Trims a title and rejects blank ones
pub(crate) fn require_title(field: &str, title: &str) -> ServiceResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::validation(field, "Title must not be empty"));
    }
    Ok(title.to_string())
}

/// Defaults a missing priority to 0 and rejects out-of-range values
///
/// Input arrives as `i64` so values too wide for the column still surface
/// as a validation error on `priority`.
pub(crate) fn resolve_priority(priority: Option<i64>) -> ServiceResult<i16> {
    let priority = i16::try_from(priority.unwrap_or(0)).unwrap_or(i16::MAX);
    check_priority(priority).map_err(|msg| ServiceError::validation("priority", msg))?;
    Ok(priority)
}
