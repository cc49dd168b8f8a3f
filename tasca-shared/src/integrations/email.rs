/// Transactional email gateway (Brevo)
///
/// Sends one HTML email per call through `POST /v3/smtp/email`.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Default Brevo API origin
pub const BREVO_BASE_URL: &str = "https://api.brevo.com";

/// A named address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mailbox {
    pub name: String,
    pub email: String,
}

impl Mailbox {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// One outgoing email
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub from: Mailbox,
    pub to: Mailbox,
    pub subject: String,
    pub html_body: String,
}

/// Email gateway error
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Email gateway rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Sends transactional email
#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Brevo REST client
#[derive(Debug, Clone)]
pub struct BrevoGateway {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody<'a> {
    sender: &'a Mailbox,
    to: [&'a Mailbox; 1],
    subject: &'a str,
    html_content: &'a str,
}

impl BrevoGateway {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, BREVO_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl EmailGateway for BrevoGateway {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let body = SendEmailBody {
            sender: &message.from,
            to: [&message.to],
            subject: &message.subject,
            html_content: &message.html_body,
        };

        let response = self
            .client
            .post(format!("{}/v3/smtp/email", self.base_url))
            .header("api-key", &self.api_key)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
