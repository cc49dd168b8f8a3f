//! In-memory store and gateway for worker tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tasca_shared::integrations::push::{PushError, PushGateway, PushMessage};
use tasca_shared::models::task::DueTask;
use uuid::Uuid;

use crate::store::ReminderStore;

pub fn due_task(user_id: Uuid, deadline: DateTime<Utc>) -> DueTask {
    DueTask {
        task_id: Uuid::new_v4(),
        task_title: "Write report".to_string(),
        deadline,
        todo_id: Uuid::new_v4(),
        todo_title: "Work".to_string(),
        user_id,
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tasks: Vec<DueTask>,
    devices: HashMap<Uuid, Vec<String>>,
    broken_users: HashSet<Uuid>,
    due_queries: AtomicUsize,
}

impl MemoryStore {
    pub fn with_task(mut self, task: DueTask) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn with_devices(mut self, user_id: Uuid, tokens: &[&str]) -> Self {
        self.devices
            .insert(user_id, tokens.iter().map(|t| t.to_string()).collect());
        self
    }

    /// Device lookups for this user fail
    pub fn with_broken_user(mut self, user_id: Uuid) -> Self {
        self.broken_users.insert(user_id);
        self
    }

    pub fn due_queries(&self) -> usize {
        self.due_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn due_tasks(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DueTask>, sqlx::Error> {
        self.due_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tasks
            .iter()
            .filter(|t| t.deadline >= start && t.deadline < end)
            .cloned()
            .collect())
    }

    async fn device_tokens(&self, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        if self.broken_users.contains(&user_id) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self.devices.get(&user_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<PushMessage>>,
    fail: bool,
}

impl RecordingGateway {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushGateway for RecordingGateway {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        if self.fail {
            return Err(PushError::Rejected {
                status: 400,
                body: r#"{"errors":["invalid player ids"]}"#.to_string(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
