/// Deadline notification dispatcher
///
/// Turns one due task into one push message addressed to all of its
/// owner's devices. The copy and delivery TTL depend on whether the task
/// is due today or tomorrow.

use std::sync::Arc;

use serde_json::json;
use tasca_shared::integrations::push::{LocalizedText, PushError, PushGateway, PushMessage};
use tasca_shared::models::task::DueTask;
use thiserror::Error;

use crate::store::ReminderStore;

/// High delivery priority
pub const NOTIFICATION_PRIORITY: u8 = 10;

/// Which scan window a task fell into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueWindow {
    /// Deadline later today
    Today,
    /// Deadline tomorrow
    Tomorrow,
}

impl DueWindow {
    /// Gateway retry window: 12h for today, 24h for tomorrow
    pub fn ttl_seconds(&self) -> u32 {
        match self {
            DueWindow::Today => 12 * 60 * 60,
            DueWindow::Tomorrow => 24 * 60 * 60,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DueWindow::Today => "today",
            DueWindow::Tomorrow => "tomorrow",
        }
    }

    fn headings(&self) -> LocalizedText {
        match self {
            DueWindow::Today => LocalizedText::new("Deadline today!", "Deadline Hari Ini!"),
            DueWindow::Tomorrow => LocalizedText::new("Deadline approaching", "Deadline Mendekat"),
        }
    }

    fn contents(&self, task: &str, todo: &str) -> LocalizedText {
        match self {
            DueWindow::Today => LocalizedText::new(
                format!(
                    "Did you forget task '{}' in '{}'? It is due today, finish it now.",
                    task, todo
                ),
                format!(
                    "Kamu lupa ya dengan Task '{}' di Todo '{}'? Deadline hari ini lhoo. Ayo selesaikan sekarang",
                    task, todo
                ),
            ),
            DueWindow::Tomorrow => LocalizedText::new(
                format!(
                    "Task '{}' in '{}' is due tomorrow. Don't forget to work on it!",
                    task, todo
                ),
                format!(
                    "Task '{}' di Todo '{}' akan berakhir besok! Ayo jangan lupa dikerjakan ya:)",
                    task, todo
                ),
            ),
        }
    }
}

/// Builds the reminder for a task
pub fn build_message(task: &DueTask, window: DueWindow, device_tokens: Vec<String>) -> PushMessage {
    PushMessage {
        device_tokens,
        headings: window.headings(),
        contents: window.contents(&task.task_title, &task.todo_title),
        data: json!({
            "task_id": task.task_id,
            "todo_id": task.todo_id,
        }),
        priority: NOTIFICATION_PRIORITY,
        ttl_seconds: window.ttl_seconds(),
    }
}

/// Dispatch error
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Device tokens could not be loaded
    #[error("Failed to load device tokens: {0}")]
    Store(#[from] sqlx::Error),

    #[error(transparent)]
    Push(#[from] PushError),
}

/// What a dispatch did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Sent to this many devices
    Sent(usize),
    /// User has no registered devices
    NoDevices,
}

/// Sends deadline reminders
#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn ReminderStore>,
    gateway: Arc<dyn PushGateway>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn ReminderStore>, gateway: Arc<dyn PushGateway>) -> Self {
        Self { store, gateway }
    }

    /// Notifies every device of the task's owner
    ///
    /// A user without devices is a successful no-op. Gateway failures are
    /// returned, not retried.
    pub async fn dispatch(
        &self,
        task: &DueTask,
        window: DueWindow,
    ) -> Result<DispatchOutcome, DispatchError> {
        let tokens = self.store.device_tokens(task.user_id).await?;
        if tokens.is_empty() {
            return Ok(DispatchOutcome::NoDevices);
        }

        let devices = tokens.len();
        let message = build_message(task, window, tokens);
        self.gateway.send(&message).await?;

        tracing::debug!(
            task_id = %task.task_id,
            user_id = %task.user_id,
            window = window.as_str(),
            devices,
            "Deadline notification sent"
        );

        Ok(DispatchOutcome::Sent(devices))
    }
}
