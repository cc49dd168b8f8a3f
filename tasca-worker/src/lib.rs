//! # Tasca Worker Library
//!
//! Deadline reminders: a scanner that finds incomplete tasks due today or
//! tomorrow, a dispatcher that turns each into a push notification, and a
//! scheduler that runs the scanner on a fixed interval.
//!
//! ## Modules
//!
//! - `store`: Queries the worker needs, behind a trait
//! - `dispatcher`: Message copy and push delivery
//! - `scanner`: One scan over the today/tomorrow windows
//! - `scheduler`: Periodic driver with graceful shutdown
//! - `config`: Environment configuration for the standalone binary
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tasca_shared::integrations::push::{OneSignalConfig, OneSignalGateway};
//! use tasca_worker::{build_scheduler, scheduler::DEFAULT_SCAN_INTERVAL};
//!
//! # async fn example(pool: sqlx::PgPool) {
//! let gateway = Arc::new(OneSignalGateway::new(OneSignalConfig::new("app", "key")));
//! let handle = build_scheduler(pool, gateway, DEFAULT_SCAN_INTERVAL).spawn();
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod scanner;
pub mod scheduler;
pub mod store;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use sqlx::PgPool;
use tasca_shared::integrations::push::PushGateway;

use crate::dispatcher::NotificationDispatcher;
use crate::scanner::DeadlineScanner;
use crate::scheduler::DeadlineScheduler;
use crate::store::{PgReminderStore, ReminderStore};

/// Wires the PostgreSQL store, a push gateway and the server-local zone
/// into a ready-to-spawn scheduler
pub fn build_scheduler(
    pool: PgPool,
    gateway: Arc<dyn PushGateway>,
    interval: Duration,
) -> DeadlineScheduler<Local> {
    let store: Arc<dyn ReminderStore> = Arc::new(PgReminderStore::new(pool));
    let dispatcher = NotificationDispatcher::new(store.clone(), gateway);
    let scanner = DeadlineScanner::new(store, dispatcher, Local);

    DeadlineScheduler::new(scanner, interval)
}
