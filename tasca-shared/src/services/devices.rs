//! Device-token registration

use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::middleware::AuthContext;
use crate::error::{ServiceError, ServiceResult};
use crate::models::device_token::DeviceToken;

/// Registration payload
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRegistration {
    pub token: String,
    pub platform: String,
}

fn non_blank(field: &str, value: &str) -> ServiceResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::validation(field, format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}

/// Registers a device, or updates the platform of a known token
pub async fn register_device(
    pool: &PgPool,
    auth: &AuthContext,
    registration: DeviceRegistration,
) -> ServiceResult<DeviceToken> {
    let token = non_blank("token", &registration.token)?;
    let platform = non_blank("platform", &registration.platform)?.to_lowercase();

    let device = DeviceToken::upsert(pool, auth.user_id, &token, &platform).await?;
    tracing::debug!(user_id = %auth.user_id, platform = %device.platform, "Device registered");
    Ok(device)
}

/// Removes one of the caller's tokens
pub async fn unregister_device(pool: &PgPool, auth: &AuthContext, token: &str) -> ServiceResult<()> {
    let token = non_blank("token", token)?;

    if !DeviceToken::delete(pool, auth.user_id, &token).await? {
        return Err(ServiceError::NotFound("Device token not found".to_string()));
    }
    Ok(())
}

pub async fn list_devices(pool: &PgPool, auth: &AuthContext) -> ServiceResult<Vec<DeviceToken>> {
    Ok(DeviceToken::list_for_user(pool, auth.user_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank("token", "  abc ").unwrap(), "abc");
        assert!(matches!(
            non_blank("platform", "  "),
            Err(ServiceError::Validation { ref field, .. }) if field == "platform"
        ));
    }
}
