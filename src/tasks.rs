//! In-memory task queue for asynchronous chat calls
//!
//! ```text
//! submit(request) → id, task stored as pending
//!     ↓ (spawned)
//! runner.run(request)
//!     ↓
//! finish(id) → done(result) | error(message), exactly once
//!     ↓
//! poll(id) → snapshot
//! ```
//!
//! Tasks live for the process lifetime unless a retention period is
//! configured, in which case a background sweep drops finished tasks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::gateway::{ChatRequest, GatewayClient, GatewayError};

/// Something that can answer a chat request (the gateway client in production)
#[async_trait]
pub trait ChatRunner: Send + Sync {
    async fn run(&self, request: ChatRequest) -> Result<String, GatewayError>;
}

#[async_trait]
impl ChatRunner for GatewayClient {
    async fn run(&self, request: ChatRequest) -> Result<String, GatewayError> {
        GatewayClient::run(self, &request).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Done,
    Error,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Snapshot of one chat task
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    #[serde(rename = "task_id")]
    pub id: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Task {
    fn pending(id: String) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TaskError {
    #[error("task {0} not found")]
    NotFound(String),
}

/// Shared task table plus the runner that resolves tasks
#[derive(Clone)]
pub struct TaskQueue {
    tasks: Arc<Mutex<HashMap<String, Task>>>,
    runner: Arc<dyn ChatRunner>,
}

impl TaskQueue {
    pub fn new(runner: Arc<dyn ChatRunner>) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            runner,
        }
    }

    /// The table is only touched for short inserts/lookups; a poisoned lock
    /// still holds consistent data, so recover it rather than panic
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Task>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a pending task and start resolving it in the background
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, request: ChatRequest) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.lock().insert(id.clone(), Task::pending(id.clone()));

        tracing::debug!(task_id = %id, "Chat task submitted");

        let queue = self.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            // The call runs as its own task so a panic surfaces as a JoinError
            let runner = queue.runner.clone();
            let call = tokio::spawn(async move { runner.run(request).await });
            let outcome = match call.await {
                Ok(result) => result.map_err(|err| err.to_string()),
                Err(join_err) => {
                    tracing::error!(task_id = %task_id, error = %join_err, "Chat task aborted");
                    Err("The travel assistant request failed unexpectedly. Please try again."
                        .to_string())
                }
            };
            queue.finish(&task_id, outcome);
        });

        id
    }

    /// Current snapshot of a task
    pub fn poll(&self, id: &str) -> Result<Task, TaskError> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    /// Single terminal transition; later writes are ignored
    fn finish(&self, id: &str, outcome: Result<String, String>) {
        let mut tasks = self.lock();
        let Some(task) = tasks.get_mut(id) else {
            // Swept or never issued; nothing to update
            tracing::debug!(task_id = %id, "Finished task no longer tracked");
            return;
        };
        if task.status.is_terminal() {
            tracing::warn!(task_id = %id, "Ignoring second completion for finished task");
            return;
        }

        match outcome {
            Ok(text) => {
                task.status = TaskStatus::Done;
                task.result = Some(text);
            }
            Err(err) => {
                tracing::warn!(task_id = %id, error = %err, "Chat task failed");
                task.status = TaskStatus::Error;
                task.error = Some(err);
            }
        }
        task.finished_at = Some(Utc::now());
    }

    /// Drop finished tasks older than `retention`; pending tasks are kept
    pub fn purge_finished(&self, retention: Duration) -> usize {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return 0;
        };
        let cutoff = Utc::now() - retention;

        let mut tasks = self.lock();
        let before = tasks.len();
        tasks.retain(|_, task| match task.finished_at {
            Some(finished) => finished > cutoff,
            None => true,
        });
        before - tasks.len()
    }

    /// Periodically purge finished tasks; runs until the runtime shuts down
    pub fn spawn_sweeper(&self, retention: Duration, interval: Duration) {
        let queue = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = queue.purge_finished(retention);
                if removed > 0 {
                    tracing::debug!(removed, "Swept finished chat tasks");
                }
            }
        });
    }

    /// Number of tracked tasks, pending and finished
    pub fn task_count(&self) -> usize {
        self.lock().len()
    }
}
