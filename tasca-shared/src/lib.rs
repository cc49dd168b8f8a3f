//! # Tasca Shared Library
//!
//! Types, persistence and business logic shared by the Tasca API server
//! and the deadline worker.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, JWT, bearer middleware, ownership checks
//! - `calendar`: Server-local day and week arithmetic
//! - `db`: Connection pool and embedded migrations
//! - `error`: Domain service error type
//! - `integrations`: Push, email, blob storage and Google sign-in clients
//! - `models`: Database models
//! - `progress`: Todo progress calculation
//! - `services`: Domain operations used by the HTTP handlers

pub mod auth;
pub mod calendar;
pub mod db;
pub mod error;
pub mod integrations;
pub mod models;
pub mod progress;
pub mod services;

/// Current version of the Tasca shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
