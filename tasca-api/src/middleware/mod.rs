/// Middleware modules for the API server
///
/// Bearer authentication lives in `tasca_shared::auth::middleware` so the
/// worker and tests can reuse it; this module only holds response hardening.

pub mod security;
