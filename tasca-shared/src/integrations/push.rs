/// Push-notification gateway
///
/// One message is addressed to every device token of a user at once; the
/// gateway does the fan-out. Failures are returned to the caller with the
/// response body for diagnostics and are never retried here.
///
/// # Example
///
/// ```no_run
/// use tasca_shared::integrations::push::{
///     LocalizedText, OneSignalConfig, OneSignalGateway, PushGateway, PushMessage,
/// };
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let gateway = OneSignalGateway::new(OneSignalConfig::new("app-id", "rest-key"));
///
/// gateway
///     .send(&PushMessage {
///         device_tokens: vec!["player-1".to_string()],
///         headings: LocalizedText::same("Hello"),
///         contents: LocalizedText::same("World"),
///         data: serde_json::json!({}),
///         priority: 10,
///         ttl_seconds: 3600,
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Default OneSignal API origin
pub const ONESIGNAL_BASE_URL: &str = "https://onesignal.com";

/// Text in English (`en`) and Indonesian (`id`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalizedText {
    pub en: String,
    pub id: String,
}

impl LocalizedText {
    pub fn new(en: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            id: id.into(),
        }
    }

    /// Same text for every language
    pub fn same(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            en: text.clone(),
            id: text,
        }
    }
}

/// A notification addressed to one or more devices
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub device_tokens: Vec<String>,
    pub headings: LocalizedText,
    pub contents: LocalizedText,
    /// Opaque payload handed to the app for deep-linking
    pub data: serde_json::Value,
    /// Gateway delivery priority (10 = high)
    pub priority: u8,
    /// How long the gateway keeps retrying delivery
    pub ttl_seconds: u32,
}

/// Push gateway error
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// Request never got a response
    #[error("Push gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// Gateway answered with a non-2xx status
    #[error("Push gateway rejected notification ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Sends push notifications
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Delivers one message to all of its device tokens
    async fn send(&self, message: &PushMessage) -> Result<(), PushError>;
}

/// OneSignal credentials
#[derive(Debug, Clone)]
pub struct OneSignalConfig {
    pub app_id: String,
    pub rest_api_key: String,
    /// Origin without trailing slash; overridable for tests
    pub base_url: String,
    pub timeout: Duration,
}

impl OneSignalConfig {
    pub fn new(app_id: impl Into<String>, rest_api_key: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            rest_api_key: rest_api_key.into(),
            base_url: ONESIGNAL_BASE_URL.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Serialize)]
struct NotificationBody<'a> {
    app_id: &'a str,
    include_player_ids: &'a [String],
    headings: &'a LocalizedText,
    contents: &'a LocalizedText,
    data: &'a serde_json::Value,
    priority: u8,
    ttl: u32,
    content_available: bool,
}

/// OneSignal REST client
#[derive(Debug, Clone)]
pub struct OneSignalGateway {
    client: reqwest::Client,
    config: OneSignalConfig,
}

impl OneSignalGateway {
    pub fn new(config: OneSignalConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();

        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/api/v1/notifications",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl PushGateway for OneSignalGateway {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        let body = NotificationBody {
            app_id: &self.config.app_id,
            include_player_ids: &message.device_tokens,
            headings: &message.headings,
            contents: &message.contents,
            data: &message.data,
            priority: message.priority,
            ttl: message.ttl_seconds,
            content_available: true,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.rest_api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(
            recipients = message.device_tokens.len(),
            "Push notification accepted"
        );
        Ok(())
    }
}
