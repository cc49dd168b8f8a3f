//! Registration, sign-in and Google account linking

use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::{Validate, ValidationErrors};

use crate::auth::jwt::{self, TokenLifetimes, TokenPair};
use crate::auth::middleware::AuthContext;
use crate::auth::password::{
    hash_password, validate_password_strength, validate_phone, validate_username, verify_password,
};
use crate::error::{ServiceError, ServiceResult};
use crate::integrations::google::GoogleIdentity;
use crate::models::user::{AuthProvider, CreateUser, UpdateUser, User};

/// Attempts at finding a free username for a new Google account
const USERNAME_ATTEMPTS: usize = 5;

const INVALID_CREDENTIALS: &str = "Invalid username/email or password";

/// Registration form
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Registration {
    pub username: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    pub phone: Option<String>,

    pub password: String,

    pub confirm_password: String,
}

/// Tokens plus the signed-in user
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: User,
}

/// First field error of a `validator` run, as a service error
pub fn first_validation_error(errors: &ValidationErrors) -> ServiceError {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string());
                ServiceError::validation(field.to_string(), message)
            })
        })
        .next()
        .unwrap_or_else(|| ServiceError::BadRequest("Validation failed".to_string()))
}

/// Checks a new password against the strength rule and its confirmation
pub fn check_new_password(password: &str, confirm: &str) -> ServiceResult<()> {
    validate_password_strength(password).map_err(|m| ServiceError::validation("password", m))?;
    if password != confirm {
        return Err(ServiceError::validation("confirm_password", "Passwords do not match"));
    }
    Ok(())
}

/// Normalizes an optional phone number; blank means none
pub fn normalize_phone(phone: Option<&str>) -> ServiceResult<Option<String>> {
    match phone.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => {
            validate_phone(p).map_err(|m| ServiceError::validation("phone", m))?;
            Ok(Some(p.to_string()))
        }
        None => Ok(None),
    }
}

/// Username candidate from the local part of an email address
///
/// Non-alphanumeric characters are dropped and short results are padded so
/// the candidate always satisfies the username rule.
pub fn username_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut base: String = local.chars().filter(|c| c.is_ascii_alphanumeric()).collect();

    if base.is_empty() {
        base.push_str("user");
    }
    while base.len() < 4 {
        base.push('0');
    }
    base
}

/// Creates a local account
pub async fn register(pool: &PgPool, form: Registration) -> ServiceResult<User> {
    form.validate().map_err(|e| first_validation_error(&e))?;

    let username = form.username.trim().to_string();
    validate_username(&username).map_err(|m| ServiceError::validation("username", m))?;
    check_new_password(&form.password, &form.confirm_password)?;
    let phone = normalize_phone(form.phone.as_deref())?;

    let password_hash = hash_password(&form.password)?;

    // Unique violations on username/email surface as 409
    let user = User::create(
        pool,
        CreateUser {
            username,
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone,
            password_hash: Some(password_hash),
            google_id: None,
            picture: None,
            provider: AuthProvider::Local,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok(user)
}

/// Issues tokens for a user
pub fn open_session(user: User, secret: &str, lifetimes: TokenLifetimes) -> ServiceResult<Session> {
    let tokens = jwt::issue_token_pair(user.id, secret, lifetimes)
        .map_err(|e| ServiceError::upstream("token issuance", e))?;
    Ok(Session { tokens, user })
}

/// Checks an email-or-username and password
///
/// Unknown users, wrong passwords and password-less accounts all fail the
/// same way.
pub async fn authenticate(pool: &PgPool, identifier: &str, password: &str) -> ServiceResult<User> {
    let user = User::find_by_identifier(pool, identifier.trim())
        .await?
        .ok_or_else(|| ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let Some(hash) = user.password_hash.as_deref() else {
        return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(password, hash)? {
        return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    Ok(user)
}

/// Finds or creates the account behind a verified Google identity
pub async fn sign_in_with_google(pool: &PgPool, identity: GoogleIdentity) -> ServiceResult<User> {
    if let Some(user) = User::find_by_google_id(pool, &identity.subject).await? {
        return Ok(user);
    }

    if let Some(user) = User::find_by_email(pool, &identity.email).await? {
        if user.provider == AuthProvider::Google {
            return Ok(user);
        }
        return Err(ServiceError::Conflict(
            "An account with this email already exists; link the account from the profile first"
                .to_string(),
        ));
    }

    let username = free_username(pool, &username_from_email(&identity.email)).await?;
    let name = identity
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| username.clone());

    let user = User::create(
        pool,
        CreateUser {
            username,
            name,
            email: identity.email,
            phone: None,
            password_hash: None,
            google_id: Some(identity.subject),
            picture: None,
            provider: AuthProvider::Google,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User registered with Google");
    Ok(user)
}

async fn free_username(pool: &PgPool, base: &str) -> ServiceResult<String> {
    if !User::username_taken(pool, base, None).await? {
        return Ok(base.to_string());
    }

    for _ in 0..USERNAME_ATTEMPTS {
        let candidate = format!("{}{}", base, rand::thread_rng().gen_range(1000..10000));
        if !User::username_taken(pool, &candidate, None).await? {
            return Ok(candidate);
        }
    }

    Err(ServiceError::Conflict("Could not derive a free username".to_string()))
}

/// Links a Google identity to the caller's local account
pub async fn link_google(
    pool: &PgPool,
    auth: &AuthContext,
    identity: GoogleIdentity,
) -> ServiceResult<User> {
    let user = User::find_by_id(pool, auth.user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

    if user.provider.has_google() {
        return Err(ServiceError::Conflict(
            "A Google account is already linked".to_string(),
        ));
    }

    if let Some(other) = User::find_by_google_id(pool, &identity.subject).await? {
        if other.id != user.id {
            return Err(ServiceError::Conflict(
                "This Google account is already linked to another user".to_string(),
            ));
        }
    }

    let patch = UpdateUser {
        google_id: Some(Some(identity.subject)),
        provider: Some(AuthProvider::Both),
        ..Default::default()
    };

    let user = User::update(pool, user.id, patch)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, "Google account linked");
    Ok(user)
}

/// Removes the Google link from an account that also has a password
pub async fn unlink_google(pool: &PgPool, auth: &AuthContext) -> ServiceResult<User> {
    let user = User::find_by_id(pool, auth.user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

    match user.provider {
        AuthProvider::Both => {}
        AuthProvider::Google => {
            return Err(ServiceError::BadRequest(
                "Set a password before unlinking Google".to_string(),
            ))
        }
        AuthProvider::Local => {
            return Err(ServiceError::BadRequest("No Google account is linked".to_string()))
        }
    }

    let patch = UpdateUser {
        google_id: Some(None),
        provider: Some(AuthProvider::Local),
        ..Default::default()
    };

    let user = User::update(pool, user.id, patch)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, "Google account unlinked");
    Ok(user)
}
