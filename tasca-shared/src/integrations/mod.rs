//! Clients for external services
//!
//! Each service sits behind an async trait so the scheduler and the HTTP
//! handlers can be driven by in-memory fakes in tests:
//!
//! - [`push::PushGateway`]: OneSignal push notifications
//! - [`email::EmailGateway`]: Brevo transactional email
//! - [`storage::BlobStore`]: S3-compatible object storage
//! - [`google::IdentityVerifier`]: Google ID-token verification

pub mod email;
pub mod google;
pub mod push;
pub mod storage;
