/// Database models for Tasca
///
/// Each model owns its SQL. Functions take a `&PgPool`, or any
/// `PgExecutor` when they must also run inside a transaction.
///
/// # Models
///
/// - `user`: accounts (local, Google, or both)
/// - `todo`: titled containers of tasks owned by one user
/// - `task`: units of work with a deadline under a todo
/// - `pomodoro`: focus minutes per user per calendar day
/// - `device_token`: push-notification tokens per user device
///
/// # Example
///
/// ```no_run
/// use tasca_shared::models::todo::{CreateTodo, Todo};
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let todo = Todo::create(&pool, CreateTodo {
///     user_id,
///     title: "Thesis".to_string(),
///     priority: 2,
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```

pub mod device_token;
pub mod pomodoro;
pub mod task;
pub mod todo;
pub mod user;

use serde::{Deserialize, Deserializer};

/// Lowest priority (0 = low)
pub const MIN_PRIORITY: i16 = 0;

/// Highest priority (3 = urgent)
pub const MAX_PRIORITY: i16 = 3;

/// Checks a todo/task priority is within `0..=3`
pub fn check_priority(priority: i16) -> Result<(), String> {
    if (MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        Ok(())
    } else {
        Err(format!(
            "Priority must be between {} and {}",
            MIN_PRIORITY, MAX_PRIORITY
        ))
    }
}

/// Deserializes a present field into `Some(value)`
///
/// Paired with `#[serde(default)]` on an `Option<Option<T>>`, this tells
/// "field absent" (`None`) apart from "field set to null" (`Some(None)`).
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}
