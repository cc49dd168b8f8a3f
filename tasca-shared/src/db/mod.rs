/// Database layer for Tasca
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool and constraint-error helpers
/// - `migrations`: embedded schema migrations
///
/// Queries live next to their models in the `models` module.
///
/// # Example
///
/// ```no_run
/// use tasca_shared::db::pool::{create_pool, DatabaseConfig};
/// use tasca_shared::db::migrations::run_migrations;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     })
///     .await?;
///
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
