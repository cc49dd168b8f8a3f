/// Authentication and authorization utilities
///
/// This module provides the authentication primitives for Tasca:
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and credential rules
/// - [`jwt`]: JWT access/refresh token generation and validation
/// - [`middleware`]: Bearer-token authentication for axum routes
/// - [`authorization`]: Ownership checks for todos and their tasks
/// - [`reset_token`]: Password-reset token generation and hashing
///
/// # Example
///
/// ```no_run
/// use tasca_shared::auth::password::{hash_password, verify_password};
/// use tasca_shared::auth::jwt::{create_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Sup3rSecret")?;
/// assert!(verify_password("Sup3rSecret", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), TokenType::Access);
/// let token = create_token(&claims, "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod reset_token;
