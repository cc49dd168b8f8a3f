/// Google sign-in verification
///
/// Clients obtain an ID token from Google and hand it to the API. The token
/// is checked against Google's `tokeninfo` endpoint and its audience must
/// match our OAuth client id.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Default tokeninfo endpoint
pub const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Verified Google profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    /// Stable Google account id (`sub`)
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Identity verification error
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Identity provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// Token is malformed, expired or was issued for another client
    #[error("Invalid Google token: {0}")]
    InvalidToken(String),
}

/// Verifies third-party ID tokens
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<serde_json::Value>,
    name: Option<String>,
    picture: Option<String>,
}

impl TokenInfo {
    fn email_verified(&self) -> bool {
        match &self.email_verified {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s == "true",
            _ => false,
        }
    }
}

/// Verifier backed by Google's tokeninfo endpoint
#[derive(Debug, Clone)]
pub struct GoogleTokenVerifier {
    client: reqwest::Client,
    client_id: String,
    tokeninfo_url: String,
}

impl GoogleTokenVerifier {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self::with_tokeninfo_url(client_id, GOOGLE_TOKENINFO_URL)
    }

    pub fn with_tokeninfo_url(client_id: impl Into<String>, tokeninfo_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            client_id: client_id.into(),
            tokeninfo_url: tokeninfo_url.into(),
        }
    }
}

#[async_trait]
impl IdentityVerifier for GoogleTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, IdentityError> {
        let response = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IdentityError::InvalidToken(format!(
                "tokeninfo returned {}",
                response.status()
            )));
        }

        let info: TokenInfo = response.json().await?;

        if info.aud != self.client_id {
            return Err(IdentityError::InvalidToken("audience mismatch".to_string()));
        }

        if !info.email_verified() {
            return Err(IdentityError::InvalidToken("email is not verified".to_string()));
        }

        let email = info
            .email
            .clone()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| IdentityError::InvalidToken("token has no email".to_string()))?;

        Ok(GoogleIdentity {
            subject: info.sub,
            email,
            name: info.name,
            picture: info.picture,
        })
    }
}
