//! Forgotten-password flow
//!
//! A reset token is emailed as a link; only its digest is persisted. The
//! email is sent in the background so the request returns immediately.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::accounts::check_new_password;
use crate::auth::password::hash_password;
use crate::auth::reset_token::{generate_reset_token, hash_reset_token, reset_token_ttl};
use crate::error::{ServiceError, ServiceResult};
use crate::integrations::email::{EmailGateway, EmailMessage, Mailbox};
use crate::models::user::User;

const INVALID_TOKEN: &str = "Reset token is invalid or has expired";

/// Email gateway plus the sender and link settings for reset mails
#[derive(Clone)]
pub struct ResetMailer {
    pub gateway: Arc<dyn EmailGateway>,
    pub sender: Mailbox,
    /// Link base; the token is appended as `?token=`
    pub reset_url: String,
}

impl ResetMailer {
    pub fn new(gateway: Arc<dyn EmailGateway>, sender: Mailbox, reset_url: impl Into<String>) -> Self {
        Self {
            gateway,
            sender,
            reset_url: reset_url.into(),
        }
    }

    /// Builds the reset email for a user
    pub fn message(&self, user: &User, token: &str) -> EmailMessage {
        let link = reset_link(&self.reset_url, token);
        let html_body = format!(
            "<p>Hi {name},</p>\
             <p>We received a request to reset your password. The link below is valid for 30 minutes.</p>\
             <p><a href=\"{link}\">Reset password</a></p>\
             <p>If you did not ask for this, you can ignore this email.</p>",
            name = html_escape(&user.name),
            link = link,
        );

        EmailMessage {
            from: self.sender.clone(),
            to: Mailbox::new(user.name.clone(), user.email.clone()),
            subject: "Reset your password".to_string(),
            html_body,
        }
    }
}

/// `{base}?token={token}`, or `&token=` when the base has a query already
pub fn reset_link(base: &str, token: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}token={}", base, separator, token)
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Reset form
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordReset {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Outcome of a token check
#[derive(Debug, Clone, Serialize)]
pub struct TokenCheck {
    pub valid: bool,
}

/// Issues a reset token and emails it
///
/// Fails with Conflict while an earlier token is still valid.
pub async fn request_password_reset(
    pool: &PgPool,
    mailer: Option<&ResetMailer>,
    email: &str,
) -> ServiceResult<()> {
    let mailer = mailer.ok_or(ServiceError::Unavailable("Email delivery"))?;

    let user = User::find_by_email(pool, email.trim())
        .await?
        .ok_or_else(|| ServiceError::NotFound("No account uses this email".to_string()))?;

    let now = Utc::now();
    if user.has_active_reset_token(now) {
        return Err(ServiceError::Conflict(
            "A reset link was already sent; check your email".to_string(),
        ));
    }

    let token = generate_reset_token();
    User::set_reset_token(pool, user.id, &hash_reset_token(&token), now + reset_token_ttl()).await?;

    let message = mailer.message(&user, &token);
    let gateway = Arc::clone(&mailer.gateway);
    let user_id = user.id;
    tokio::spawn(async move {
        match gateway.send(&message).await {
            Ok(()) => tracing::info!(user_id = %user_id, "Password reset email sent"),
            Err(e) => tracing::error!(user_id = %user_id, error = %e, "Failed to send password reset email"),
        }
    });

    Ok(())
}

async fn user_for_token(pool: &PgPool, token: &str) -> ServiceResult<User> {
    if token.trim().is_empty() {
        return Err(ServiceError::BadRequest(INVALID_TOKEN.to_string()));
    }

    let user = User::find_by_reset_token_hash(pool, &hash_reset_token(token))
        .await?
        .ok_or_else(|| ServiceError::BadRequest(INVALID_TOKEN.to_string()))?;

    if !user.has_active_reset_token(Utc::now()) {
        return Err(ServiceError::BadRequest(INVALID_TOKEN.to_string()));
    }

    Ok(user)
}

/// Checks that a reset token exists and has not expired
pub async fn validate_reset_token(pool: &PgPool, token: &str) -> ServiceResult<TokenCheck> {
    user_for_token(pool, token).await?;
    Ok(TokenCheck { valid: true })
}

/// Sets a new password with a reset token and consumes the token
pub async fn reset_password(pool: &PgPool, form: PasswordReset) -> ServiceResult<()> {
    let user = user_for_token(pool, &form.token).await?;
    check_new_password(&form.new_password, &form.confirm_password)?;

    let hash = hash_password(&form.new_password)?;
    User::reset_password(pool, user.id, &hash).await?;

    tracing::info!(user_id = %user.id, "Password reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::email::EmailError;
    use crate::models::user::AuthProvider;
    use async_trait::async_trait;
    use uuid::Uuid;

    struct NullGateway;

    #[async_trait]
    impl EmailGateway for NullGateway {
        async fn send(&self, _message: &EmailMessage) -> Result<(), EmailError> {
            Ok(())
        }
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            name: "Alice <A>".to_string(),
            email: "alice@example.com".to_string(),
            phone: None,
            password_hash: None,
            google_id: None,
            picture: None,
            provider: AuthProvider::Local,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_reset_link() {
        assert_eq!(
            reset_link("https://app.example.com/reset", "abc"),
            "https://app.example.com/reset?token=abc"
        );
        assert_eq!(
            reset_link("https://app.example.com/reset?lang=id", "abc"),
            "https://app.example.com/reset?lang=id&token=abc"
        );
    }

    #[test]
    fn test_message_addresses_user() {
        let mailer = ResetMailer::new(
            Arc::new(NullGateway),
            Mailbox::new("Tasca", "no-reply@example.com"),
            "https://app.example.com/reset",
        );
        let message = mailer.message(&user(), "abc123");

        assert_eq!(message.to.email, "alice@example.com");
        assert_eq!(message.from.name, "Tasca");
        assert!(message.html_body.contains("https://app.example.com/reset?token=abc123"));
        assert!(message.html_body.contains("Alice &lt;A&gt;"));
    }
}
