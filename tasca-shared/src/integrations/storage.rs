/// Blob storage for profile pictures
///
/// [`BlobStore`] is the seam; [`S3BlobStore`] talks to any S3-compatible
/// service and [`MemoryBlobStore`] keeps objects in a map for tests and
/// local development. The store is built once at startup and passed down
/// explicitly; nothing in the crate reaches for a global client.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

/// Attempts made by [`S3BlobStore::put`] before giving up
pub const PUT_ATTEMPTS: u32 = 3;

/// Blob storage error
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Upload failed after every retry
    #[error("Failed to upload {key}: {message}")]
    Upload { key: String, message: String },

    #[error("Failed to delete {key}: {message}")]
    Delete { key: String, message: String },

    #[error("Failed to stat {key}: {message}")]
    Head { key: String, message: String },
}

/// Object storage keyed by path-like strings
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `key`, replacing any existing object
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// Deletes `key`; deleting a missing key succeeds
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Whether `key` exists
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Public URL of `key`, `{base_url}/{key}`
    fn url_for(&self, key: &str) -> String;
}

/// Joins a base URL and a key with exactly one slash
pub fn public_url(base_url: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

/// Detects an image MIME type from magic bytes
///
/// Only PNG, JPEG, GIF and WebP are accepted as profile pictures.
pub fn detect_image_content_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// Object key for a newly uploaded profile picture
///
/// `profiles/{user_id}_{unix_seconds}_{filename}` with the filename reduced
/// to a safe character set.
pub fn profile_picture_key(user_id: Uuid, unix_seconds: i64, filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let mut safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if safe.trim_matches(['.', '_']).is_empty() {
        safe = "picture".to_string();
    }

    format!("profiles/{}_{}_{}", user_id, unix_seconds, safe)
}

/// S3 connection settings
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Custom endpoint for S3-compatible services
    pub endpoint: Option<String>,
    /// Prefix for public object URLs
    pub public_base_url: String,
}

/// S3-backed blob store
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3BlobStore {
    /// Builds the SDK client from static credentials
    pub async fn connect(config: S3Config) -> Self {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "tasca-static",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;

        Self {
            client: Client::new(&sdk_config),
            bucket: config.bucket,
            public_base_url: config.public_base_url,
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        let mut last_error = String::new();

        for attempt in 1..=PUT_ATTEMPTS {
            let result = self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .content_type(content_type)
                .body(ByteStream::from(bytes.clone()))
                .send()
                .await;

            match result {
                Ok(_) => return Ok(()),
                Err(e) => {
                    last_error = e.to_string();
                    warn!(key, attempt, error = %last_error, "S3 upload attempt failed");

                    if attempt < PUT_ATTEMPTS {
                        // 500ms, 1s, ...
                        tokio::time::sleep(Duration::from_millis(500 << (attempt - 1))).await;
                    }
                }
            }
        }

        Err(StorageError::Upload {
            key: key.to_string(),
            message: last_error,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().map(|se| se.is_not_found()).unwrap_or(false) => {
                Ok(false)
            }
            Err(e) => Err(StorageError::Head {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn url_for(&self, key: &str) -> String {
        public_url(&self.public_base_url, key)
    }
}

/// In-memory blob store
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    base_url: String,
    objects: Mutex<HashMap<String, (Bytes, String)>>,
}

impl MemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Keys currently stored, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Content type stored with `key`
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(key).map(|(_, ct)| ct.clone()))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        let mut objects = self.objects.lock().map_err(|e| StorageError::Upload {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        objects.insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut objects = self.objects.lock().map_err(|e| StorageError::Delete {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        objects.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let objects = self.objects.lock().map_err(|e| StorageError::Head {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(objects.contains_key(key))
    }

    fn url_for(&self, key: &str) -> String {
        public_url(&self.base_url, key)
    }
}
