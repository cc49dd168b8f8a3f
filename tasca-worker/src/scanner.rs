/// Deadline scanner
///
/// One scan looks at incomplete tasks due today or tomorrow (server-local
/// calendar days) and sends a reminder for each:
///
/// - due tomorrow: always notified
/// - due today: notified only while the deadline is still ahead of `now`
///
/// There is no memory between scans, so a task keeps being reminded on
/// every run until it is completed or its deadline passes. A failure on one
/// task is logged and the scan moves on.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tasca_shared::calendar::{day_bounds, local_day};
use tasca_shared::models::task::DueTask;
use thiserror::Error;
use tracing::{info, warn};

use crate::dispatcher::{DispatchOutcome, DueWindow, NotificationDispatcher};
use crate::store::ReminderStore;

/// Scan error; only the initial query can abort a scan
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to query due tasks: {0}")]
    Store(#[from] sqlx::Error),
}

/// Counters for one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Open tasks due tomorrow
    pub tomorrow_due: usize,
    /// Open tasks due today, including already elapsed ones
    pub today_due: usize,
    /// Today tasks whose deadline had already passed
    pub skipped_elapsed: usize,
    /// Reminders accepted by the gateway
    pub notified: usize,
    /// Owners without any registered device
    pub no_devices: usize,
    /// Lookups or sends that failed
    pub failed: usize,
}

/// Whether a task in `window` should be reminded at `now`
///
/// A same-day deadline must be strictly after `now`; one falling exactly
/// on `now` counts as elapsed.
pub fn should_notify(window: DueWindow, deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    match window {
        DueWindow::Tomorrow => true,
        DueWindow::Today => deadline > now,
    }
}

/// Finds due tasks and hands them to the dispatcher
pub struct DeadlineScanner<Tz: TimeZone> {
    store: Arc<dyn ReminderStore>,
    dispatcher: NotificationDispatcher,
    tz: Tz,
}

impl<Tz> DeadlineScanner<Tz>
where
    Tz: TimeZone + Send + Sync,
    Tz::Offset: Send + Sync,
{
    /// # Arguments
    ///
    /// * `tz` - Zone that defines "today" and "tomorrow"
    pub fn new(store: Arc<dyn ReminderStore>, dispatcher: NotificationDispatcher, tz: Tz) -> Self {
        Self {
            store,
            dispatcher,
            tz,
        }
    }

    /// Scans relative to the current time
    pub async fn scan(&self) -> Result<ScanReport, ScanError> {
        self.scan_at(Utc::now()).await
    }

    /// Scans as if the current time were `now`
    pub async fn scan_at(&self, now: DateTime<Utc>) -> Result<ScanReport, ScanError> {
        let today = local_day(&self.tz, now);
        let tomorrow = today.succ_opt().unwrap_or(today);

        let (today_start, _) = day_bounds(&self.tz, today);
        let (_, tomorrow_end) = day_bounds(&self.tz, tomorrow);

        let tasks = self.store.due_tasks(today_start, tomorrow_end).await?;
        let mut report = ScanReport::default();

        for task in &tasks {
            let window = if local_day(&self.tz, task.deadline) == today {
                report.today_due += 1;
                DueWindow::Today
            } else {
                report.tomorrow_due += 1;
                DueWindow::Tomorrow
            };

            if !should_notify(window, task.deadline, now) {
                report.skipped_elapsed += 1;
                continue;
            }

            self.notify(task, window, &mut report).await;
        }

        info!(
            tomorrow_due = report.tomorrow_due,
            today_due = report.today_due,
            skipped_elapsed = report.skipped_elapsed,
            notified = report.notified,
            no_devices = report.no_devices,
            failed = report.failed,
            "Deadline scan finished"
        );

        Ok(report)
    }

    async fn notify(&self, task: &DueTask, window: DueWindow, report: &mut ScanReport) {
        match self.dispatcher.dispatch(task, window).await {
            Ok(DispatchOutcome::Sent(_)) => report.notified += 1,
            Ok(DispatchOutcome::NoDevices) => report.no_devices += 1,
            Err(e) => {
                report.failed += 1;
                warn!(
                    task_id = %task.task_id,
                    user_id = %task.user_id,
                    window = window.as_str(),
                    error = %e,
                    "Failed to send deadline notification"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{due_task, MemoryStore, RecordingGateway};
    use uuid::Uuid;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    fn scanner(store: MemoryStore, gateway: Arc<RecordingGateway>) -> DeadlineScanner<Utc> {
        let store: Arc<dyn ReminderStore> = Arc::new(store);
        let dispatcher = NotificationDispatcher::new(store.clone(), gateway);
        DeadlineScanner::new(store, dispatcher, Utc)
    }

    #[test]
    fn test_should_notify() {
        assert!(should_notify(DueWindow::Tomorrow, at(16, 1), at(15, 23)));
        assert!(should_notify(DueWindow::Today, at(15, 9), at(15, 8)));
        assert!(!should_notify(DueWindow::Today, at(15, 9), at(15, 10)));
        assert!(!should_notify(DueWindow::Today, at(15, 9), at(15, 9)));
    }

    #[tokio::test]
    async fn test_elapsed_deadline_today_is_skipped() {
        let user = Uuid::new_v4();
        let store = MemoryStore::default()
            .with_task(due_task(user, at(15, 9)))
            .with_devices(user, &["p1"]);
        let gateway = Arc::new(RecordingGateway::default());

        let report = scanner(store, gateway.clone()).scan_at(at(15, 10)).await.unwrap();

        assert_eq!(report.today_due, 1);
        assert_eq!(report.skipped_elapsed, 1);
        assert_eq!(report.notified, 0);
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_upcoming_deadline_today_is_notified() {
        let user = Uuid::new_v4();
        let store = MemoryStore::default()
            .with_task(due_task(user, at(15, 9)))
            .with_devices(user, &["p1"]);
        let gateway = Arc::new(RecordingGateway::default());

        let report = scanner(store, gateway.clone()).scan_at(at(15, 8)).await.unwrap();

        assert_eq!(report.notified, 1);
        let sent = gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].ttl_seconds, 43_200);
    }

    #[tokio::test]
    async fn test_tomorrow_is_notified_regardless_of_time() {
        let user = Uuid::new_v4();
        let store = MemoryStore::default()
            .with_task(due_task(user, at(16, 0)))
            .with_devices(user, &["p1"]);
        let gateway = Arc::new(RecordingGateway::default());

        let report = scanner(store, gateway.clone()).scan_at(at(15, 23)).await.unwrap();

        assert_eq!(report.tomorrow_due, 1);
        assert_eq!(report.notified, 1);
        assert_eq!(gateway.sent()[0].ttl_seconds, 86_400);
    }

    #[tokio::test]
    async fn test_tasks_outside_window_are_ignored() {
        let user = Uuid::new_v4();
        let store = MemoryStore::default()
            .with_task(due_task(user, at(17, 9)))
            .with_task(due_task(user, at(14, 9)))
            .with_devices(user, &["p1"]);
        let gateway = Arc::new(RecordingGateway::default());

        let report = scanner(store, gateway.clone()).scan_at(at(15, 8)).await.unwrap();

        assert_eq!(report, ScanReport::default());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_scan() {
        let broken = Uuid::new_v4();
        let healthy = Uuid::new_v4();
        let store = MemoryStore::default()
            .with_task(due_task(broken, at(16, 9)))
            .with_task(due_task(healthy, at(16, 10)))
            .with_task(due_task(Uuid::new_v4(), at(16, 11)))
            .with_broken_user(broken)
            .with_devices(healthy, &["p1"]);
        let gateway = Arc::new(RecordingGateway::default());

        let report = scanner(store, gateway.clone()).scan_at(at(15, 12)).await.unwrap();

        assert_eq!(report.tomorrow_due, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.notified, 1);
        assert_eq!(report.no_devices, 1);
        assert_eq!(gateway.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_gateway_failures_are_counted() {
        let user = Uuid::new_v4();
        let store = MemoryStore::default()
            .with_task(due_task(user, at(16, 9)))
            .with_task(due_task(user, at(15, 20)))
            .with_devices(user, &["p1"]);

        let report = scanner(store, Arc::new(RecordingGateway::failing()))
            .scan_at(at(15, 12))
            .await
            .unwrap();

        assert_eq!(report.failed, 2);
        assert_eq!(report.notified, 0);
    }
}
