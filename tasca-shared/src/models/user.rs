/// User model and database operations
///
/// A user signs up either locally (username + password) or with Google.
/// Linking Google to a local account turns the provider into `both`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username TEXT NOT NULL UNIQUE,
///     name TEXT NOT NULL DEFAULT '',
///     email TEXT NOT NULL UNIQUE,
///     phone TEXT,
///     password_hash TEXT,
///     google_id TEXT UNIQUE,
///     picture TEXT,
///     provider TEXT NOT NULL DEFAULT 'local',
///     reset_token_hash TEXT,
///     reset_token_expires_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tasca_shared::models::user::{AuthProvider, CreateUser, User};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     username: "jane doe".to_string(),
///     name: "Jane Doe".to_string(),
///     email: "jane@example.com".to_string(),
///     phone: None,
///     password_hash: Some("$argon2id$...".to_string()),
///     google_id: None,
///     picture: None,
///     provider: AuthProvider::Local,
/// })
/// .await?;
///
/// let found = User::find_by_identifier(&pool, "jane doe").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// How a user signs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Username/email + password
    Local,

    /// Google only, no password set
    Google,

    /// Password and a linked Google identity
    Both,
}

impl AuthProvider {
    /// Value stored in the `provider` column
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Local => "local",
            AuthProvider::Google => "google",
            AuthProvider::Both => "both",
        }
    }

    /// Whether the account can sign in with a password
    pub fn has_password(&self) -> bool {
        matches!(self, AuthProvider::Local | AuthProvider::Both)
    }

    /// Whether a Google identity is linked
    pub fn has_google(&self) -> bool {
        matches!(self, AuthProvider::Google | AuthProvider::Both)
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized `provider` column value
#[derive(Debug, thiserror::Error)]
#[error("Unknown auth provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for AuthProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(AuthProvider::Local),
            "google" => Ok(AuthProvider::Google),
            "both" => Ok(AuthProvider::Both),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

impl TryFrom<String> for AuthProvider {
    type Error = UnknownProvider;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// User account
///
/// Credential and reset-token columns are never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Unique, letters/digits/spaces
    pub username: String,

    pub name: String,

    /// Unique
    pub email: String,

    pub phone: Option<String>,

    /// Argon2id hash; `None` for Google-only accounts
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,

    /// Google subject id when linked
    pub google_id: Option<String>,

    /// Blob-store key of the profile picture
    pub picture: Option<String>,

    #[sqlx(try_from = "String")]
    pub provider: AuthProvider,

    /// SHA-256 of the pending reset token
    #[serde(skip_serializing, default)]
    pub reset_token_hash: Option<String>,

    #[serde(skip_serializing, default)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    /// Argon2id hash, not the plaintext password
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub picture: Option<String>,
    pub provider: AuthProvider,
}

/// Patch for an existing user
///
/// `None` leaves a column alone. For nullable columns `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub name: Option<String>,
    pub phone: Option<Option<String>>,
    pub picture: Option<Option<String>>,
    pub password_hash: Option<String>,
    pub google_id: Option<Option<String>>,
    pub provider: Option<AuthProvider>,
}

impl UpdateUser {
    /// True when no column would change
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.name.is_none()
            && self.phone.is_none()
            && self.picture.is_none()
            && self.password_hash.is_none()
            && self.google_id.is_none()
            && self.provider.is_none()
    }
}

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Unique violations on `username`, `email` or `google_id` are returned
    /// as `sqlx::Error::Database`.
    pub async fn create<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, name, email, phone, password_hash, google_id, picture, provider)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(data.username)
        .bind(data.name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.password_hash)
        .bind(data.google_id)
        .bind(data.picture)
        .bind(data.provider.as_str())
        .fetch_one(executor)
        .await
    }

    /// Finds a user by id
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by exact username
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email or username, as typed on the login form
    pub async fn find_by_identifier(
        pool: &PgPool,
        identifier: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE LOWER(email) = LOWER($1) OR username = $1
            ORDER BY (LOWER(email) = LOWER($1)) DESC
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .fetch_optional(pool)
        .await
    }

    /// Finds the user linked to a Google subject id
    pub async fn find_by_google_id(
        pool: &PgPool,
        google_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE google_id = $1")
            .bind(google_id)
            .fetch_optional(pool)
            .await
    }

    /// Finds the user holding a reset token, by the token's SHA-256
    pub async fn find_by_reset_token_hash(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE reset_token_hash = $1")
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Loads a user and locks the row until the transaction ends
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Checks whether another user already has this username
    pub async fn username_taken<'e, E>(
        executor: E,
        username: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(username)
        .bind(exclude_id)
        .fetch_one(executor)
        .await
    }

    /// Applies a patch; `updated_at` is always bumped
    ///
    /// # Returns
    ///
    /// The updated user, or `None` if the id does not exist
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = NOW()");

        if let Some(username) = data.username {
            query.push(", username = ").push_bind(username);
        }
        if let Some(name) = data.name {
            query.push(", name = ").push_bind(name);
        }
        if let Some(phone) = data.phone {
            query.push(", phone = ").push_bind(phone);
        }
        if let Some(picture) = data.picture {
            query.push(", picture = ").push_bind(picture);
        }
        if let Some(password_hash) = data.password_hash {
            query.push(", password_hash = ").push_bind(password_hash);
        }
        if let Some(google_id) = data.google_id {
            query.push(", google_id = ").push_bind(google_id);
        }
        if let Some(provider) = data.provider {
            query.push(", provider = ").push_bind(provider.as_str());
        }

        query.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        query.build_query_as::<User>().fetch_optional(executor).await
    }

    /// Stores a reset-token hash and its expiry
    pub async fn set_reset_token(
        pool: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET reset_token_hash = $2, reset_token_expires_at = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets a new password hash and clears any pending reset token
    pub async fn reset_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                reset_token_hash = NULL,
                reset_token_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user; todos, tasks, pomodoros and device tokens cascade
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether a reset token is pending and not yet expired at `now`
    pub fn has_active_reset_token(&self, now: DateTime<Utc>) -> bool {
        matches!(
            (&self.reset_token_hash, self.reset_token_expires_at),
            (Some(_), Some(expires_at)) if expires_at > now
        )
    }
}
