/// Ownership checks for todos and tasks
///
/// Every todo-scoped read or write goes through these helpers. A missing
/// todo is reported as not found, a todo owned by someone else as
/// [`AuthzError::NotOwner`], so the API never silently no-ops on a foreign
/// resource.
///
/// # Example
///
/// ```no_run
/// use tasca_shared::auth::authorization::require_todo_owner;
/// use tasca_shared::auth::middleware::AuthContext;
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, auth: AuthContext, todo_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let todo = require_todo_owner(&pool, &auth, todo_id).await?;
/// println!("{} belongs to the caller", todo.title);
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::task::Task;
use crate::models::todo::Todo;

/// Authorization error types
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// The caller does not own the resource
    #[error("You do not have access to this resource")]
    NotOwner,

    /// Todo does not exist
    #[error("Todo {0} not found")]
    TodoNotFound(Uuid),

    /// Task does not exist under the given todo
    #[error("Task {0} not found")]
    TaskNotFound(Uuid),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Checks that the caller is the owner of a resource
pub fn require_ownership(auth: &AuthContext, resource_owner_id: Uuid) -> Result<(), AuthzError> {
    if auth.user_id != resource_owner_id {
        return Err(AuthzError::NotOwner);
    }

    Ok(())
}

/// Loads a todo and checks the caller owns it
///
/// # Errors
///
/// - `AuthzError::TodoNotFound` if no todo has this id
/// - `AuthzError::NotOwner` if it belongs to another user
pub async fn require_todo_owner(
    pool: &PgPool,
    auth: &AuthContext,
    todo_id: Uuid,
) -> Result<Todo, AuthzError> {
    let todo = Todo::find_by_id(pool, todo_id)
        .await?
        .ok_or(AuthzError::TodoNotFound(todo_id))?;

    require_ownership(auth, todo.user_id)?;

    Ok(todo)
}

/// Loads a task under a todo the caller owns
///
/// Ownership of the parent is checked before the task is looked up, so a
/// foreign todo is always `NotOwner` whatever the task id.
pub async fn require_owned_task(
    pool: &PgPool,
    auth: &AuthContext,
    todo_id: Uuid,
    task_id: Uuid,
) -> Result<(Todo, Task), AuthzError> {
    let todo = require_todo_owner(pool, auth, todo_id).await?;

    let task = Task::find_in_todo(pool, todo_id, task_id)
        .await?
        .ok_or(AuthzError::TaskNotFound(task_id))?;

    Ok((todo, task))
}
