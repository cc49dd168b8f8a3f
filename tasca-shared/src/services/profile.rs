//! Profile reads and edits
//!
//! The `picture` column stores a blob key, never a URL. URLs are derived
//! from the configured [`BlobStore`] on read.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::warn;

use super::accounts::{check_new_password, normalize_phone};
use crate::auth::middleware::AuthContext;
use crate::auth::password::{hash_password, validate_username, verify_password};
use crate::error::{ServiceError, ServiceResult};
use crate::integrations::storage::{detect_image_content_type, profile_picture_key, BlobStore};
use crate::models::user::{UpdateUser, User};

/// Blob store and default picture used for profile pictures
#[derive(Clone)]
pub struct ProfileAssets {
    pub store: Option<Arc<dyn BlobStore>>,
    pub default_picture_key: String,
}

impl ProfileAssets {
    pub fn new(store: Option<Arc<dyn BlobStore>>, default_picture_key: impl Into<String>) -> Self {
        Self {
            store,
            default_picture_key: default_picture_key.into(),
        }
    }

    /// Public URL of a user's picture, falling back to the default key
    pub fn picture_url(&self, picture: Option<&str>) -> Option<String> {
        let key = picture.unwrap_or(&self.default_picture_key);
        self.store.as_ref().map(|store| store.url_for(key))
    }

    fn require_store(&self) -> ServiceResult<&Arc<dyn BlobStore>> {
        self.store.as_ref().ok_or(ServiceError::Unavailable("Blob storage"))
    }

    /// Deletes a custom picture, logging instead of failing
    async fn discard(&self, key: &str) {
        if key == self.default_picture_key {
            return;
        }
        if let Some(store) = &self.store {
            if let Err(e) = store.delete(key).await {
                warn!(key, error = %e, "Failed to delete profile picture");
            }
        }
    }
}

/// A user as shown to themselves
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub user: User,
    pub picture_url: Option<String>,
}

impl ProfileView {
    pub fn new(user: User, assets: &ProfileAssets) -> Self {
        let picture_url = assets.picture_url(user.picture.as_deref());
        Self { user, picture_url }
    }
}

/// An uploaded picture file
#[derive(Debug, Clone)]
pub struct PictureUpload {
    pub filename: String,
    pub bytes: Bytes,
}

/// Profile edit; `phone: Some(None)` clears the phone
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub name: Option<String>,
    pub phone: Option<Option<String>>,
    pub picture: Option<PictureUpload>,
}

/// Password change form
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

async fn load_user(pool: &PgPool, auth: &AuthContext) -> ServiceResult<User> {
    User::find_by_id(pool, auth.user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
}

/// Reads the caller's profile
pub async fn get_profile(
    pool: &PgPool,
    auth: &AuthContext,
    assets: &ProfileAssets,
) -> ServiceResult<ProfileView> {
    let user = load_user(pool, auth).await?;
    Ok(ProfileView::new(user, assets))
}

/// Validates the text fields of an update into a user patch
fn build_patch(update: &ProfileUpdate) -> ServiceResult<UpdateUser> {
    let username = match &update.username {
        Some(u) => {
            let u = u.trim().to_string();
            validate_username(&u).map_err(|m| ServiceError::validation("username", m))?;
            Some(u)
        }
        None => None,
    };

    let name = match &update.name {
        Some(n) if n.trim().is_empty() => {
            return Err(ServiceError::validation("name", "Name must not be empty"));
        }
        Some(n) => Some(n.trim().to_string()),
        None => None,
    };

    let phone = match &update.phone {
        Some(p) => Some(normalize_phone(p.as_deref())?),
        None => None,
    };

    Ok(UpdateUser {
        username,
        name,
        phone,
        ..Default::default()
    })
}

/// Applies a profile edit
///
/// A new picture is uploaded before the transaction. The user row is then
/// locked, the username checked for conflicts and the patch written. If
/// anything after the upload fails the new blob is removed; after commit
/// the previous custom picture is removed.
pub async fn update_profile(
    pool: &PgPool,
    auth: &AuthContext,
    assets: &ProfileAssets,
    update: ProfileUpdate,
) -> ServiceResult<ProfileView> {
    let mut patch = build_patch(&update)?;

    let uploaded = match &update.picture {
        Some(upload) => {
            let store = assets.require_store()?;
            let content_type = detect_image_content_type(&upload.bytes).ok_or_else(|| {
                ServiceError::validation("picture", "Picture must be a PNG, JPEG, GIF or WebP image")
            })?;

            let key = profile_picture_key(auth.user_id, Utc::now().timestamp(), &upload.filename);
            store
                .put(&key, upload.bytes.clone(), content_type)
                .await
                .map_err(|e| ServiceError::upstream("picture upload", e))?;

            patch.picture = Some(Some(key.clone()));
            Some(key)
        }
        None => None,
    };

    match apply_patch(pool, auth, patch).await {
        Ok((previous, user)) => {
            if uploaded.is_some() {
                if let Some(old) = previous.picture.as_deref() {
                    assets.discard(old).await;
                }
            }
            tracing::info!(user_id = %user.id, "Profile updated");
            Ok(ProfileView::new(user, assets))
        }
        Err(e) => {
            if let Some(key) = &uploaded {
                assets.discard(key).await;
            }
            Err(e)
        }
    }
}

/// Writes a patch under a row lock; returns the user before and after
async fn apply_patch(
    pool: &PgPool,
    auth: &AuthContext,
    patch: UpdateUser,
) -> ServiceResult<(User, User)> {
    let mut tx = pool.begin().await?;

    let previous = User::lock_for_update(&mut *tx, auth.user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

    if let Some(username) = &patch.username {
        if *username != previous.username
            && User::username_taken(&mut *tx, username, Some(previous.id)).await?
        {
            return Err(ServiceError::Conflict("Username is already taken".to_string()));
        }
    }

    if patch.is_empty() {
        tx.commit().await?;
        return Ok((previous.clone(), previous));
    }

    let user = User::update(&mut *tx, previous.id, patch)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

    tx.commit().await?;
    Ok((previous, user))
}

/// Removes the caller's custom picture
pub async fn delete_picture(
    pool: &PgPool,
    auth: &AuthContext,
    assets: &ProfileAssets,
) -> ServiceResult<ProfileView> {
    let user = load_user(pool, auth).await?;

    let Some(key) = user.picture.clone() else {
        return Ok(ProfileView::new(user, assets));
    };

    let patch = UpdateUser {
        picture: Some(None),
        ..Default::default()
    };
    let user = User::update(pool, user.id, patch)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

    assets.discard(&key).await;
    Ok(ProfileView::new(user, assets))
}

/// Changes the caller's password
pub async fn change_password(
    pool: &PgPool,
    auth: &AuthContext,
    form: PasswordChange,
) -> ServiceResult<()> {
    let user = load_user(pool, auth).await?;

    let Some(hash) = user.password_hash.as_deref() else {
        return Err(ServiceError::BadRequest(
            "This account signs in with Google and has no password".to_string(),
        ));
    };

    if !verify_password(&form.current_password, hash)? {
        return Err(ServiceError::Unauthorized("Current password is incorrect".to_string()));
    }

    check_new_password(&form.new_password, &form.confirm_password)?;

    let patch = UpdateUser {
        password_hash: Some(hash_password(&form.new_password)?),
        ..Default::default()
    };
    User::update(pool, user.id, patch).await?;

    tracing::info!(user_id = %user.id, "Password changed");
    Ok(())
}

/// Deletes the caller's account and everything it owns
pub async fn delete_account(
    pool: &PgPool,
    auth: &AuthContext,
    assets: &ProfileAssets,
) -> ServiceResult<()> {
    let user = load_user(pool, auth).await?;

    if !User::delete(pool, user.id).await? {
        return Err(ServiceError::NotFound("User not found".to_string()));
    }

    if let Some(key) = user.picture.as_deref() {
        assets.discard(key).await;
    }

    tracing::info!(user_id = %user.id, "Account deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::storage::MemoryBlobStore;

    #[test]
    fn test_picture_url_falls_back_to_default() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new("https://cdn.example.com"));
        let assets = ProfileAssets::new(Some(store), "nopp.png");

        assert_eq!(
            assets.picture_url(None).as_deref(),
            Some("https://cdn.example.com/nopp.png")
        );
        assert_eq!(
            assets.picture_url(Some("profiles/a.png")).as_deref(),
            Some("https://cdn.example.com/profiles/a.png")
        );
    }

    #[test]
    fn test_picture_url_without_store() {
        let assets = ProfileAssets::new(None, "nopp.png");
        assert_eq!(assets.picture_url(None), None);
    }

    #[test]
    fn test_build_patch_validates_fields() {
        let update = ProfileUpdate {
            username: Some(" bob smith ".to_string()),
            phone: Some(None),
            ..Default::default()
        };
        let patch = build_patch(&update).unwrap();
        assert_eq!(patch.username.as_deref(), Some("bob smith"));
        assert_eq!(patch.phone, Some(None));
        assert!(patch.name.is_none());

        let bad = ProfileUpdate {
            username: Some("b!".to_string()),
            ..Default::default()
        };
        assert!(matches!(build_patch(&bad), Err(ServiceError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_discard_keeps_default_picture() {
        let memory = Arc::new(MemoryBlobStore::new("https://cdn.example.com"));
        memory
            .put("nopp.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap();
        memory
            .put("profiles/old.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap();

        let store: Arc<dyn BlobStore> = memory.clone();
        let assets = ProfileAssets::new(Some(store), "nopp.png");

        assets.discard("nopp.png").await;
        assets.discard("profiles/old.png").await;

        assert_eq!(memory.keys(), vec!["nopp.png".to_string()]);
    }
}
