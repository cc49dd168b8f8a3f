/// Periodic deadline scheduler
///
/// Runs a scan immediately, then once per interval (six hours by default).
/// A scan always finishes before the next tick is taken; ticks missed
/// while a scan was running are delayed rather than bunched up.
///
/// # Example
///
/// ```no_run
/// use tasca_worker::scheduler::DeadlineScheduler;
/// # use tasca_worker::scanner::DeadlineScanner;
/// # async fn example(scanner: DeadlineScanner<chrono::Local>) {
/// let scheduler = DeadlineScheduler::new(scanner, std::time::Duration::from_secs(6 * 3600));
/// let shutdown = scheduler.shutdown_token();
/// let handle = scheduler.spawn();
///
/// // later
/// shutdown.cancel();
/// handle.await.ok();
/// # }
/// ```

use std::time::Duration;

use chrono::TimeZone;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::scanner::DeadlineScanner;

/// Default time between scans
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Drives a [`DeadlineScanner`] on a fixed interval
pub struct DeadlineScheduler<Tz: TimeZone> {
    scanner: DeadlineScanner<Tz>,
    interval: Duration,
    shutdown_token: CancellationToken,
}

impl<Tz> DeadlineScheduler<Tz>
where
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    pub fn new(scanner: DeadlineScanner<Tz>, interval: Duration) -> Self {
        Self {
            scanner,
            interval,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Token that stops the loop when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs until the shutdown token is cancelled
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Deadline scheduler starting");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.scanner.scan().await {
                        tracing::error!(error = %e, "Deadline scan failed");
                    }
                }
            }
        }

        tracing::info!("Deadline scheduler stopped");
    }

    /// Runs the loop on the Tokio runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::NotificationDispatcher;
    use crate::store::ReminderStore;
    use crate::testing::{MemoryStore, RecordingGateway};
    use chrono::Utc;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_scans_immediately_then_every_interval() {
        let store = Arc::new(MemoryStore::default());
        let dyn_store: Arc<dyn ReminderStore> = store.clone();
        let dispatcher =
            NotificationDispatcher::new(dyn_store.clone(), Arc::new(RecordingGateway::default()));
        let scanner = DeadlineScanner::new(dyn_store, dispatcher, Utc);

        let scheduler = DeadlineScheduler::new(scanner, DEFAULT_SCAN_INTERVAL);
        let shutdown = scheduler.shutdown_token();
        let handle = scheduler.spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.due_queries(), 1);

        tokio::time::sleep(DEFAULT_SCAN_INTERVAL).await;
        assert_eq!(store.due_queries(), 2);

        shutdown.cancel();
        handle.await.unwrap();
        assert_eq!(store.due_queries(), 2);
    }
}
