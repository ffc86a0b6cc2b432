//! Shared state handed to every handler

use std::sync::Arc;

use crate::tasks::{ChatRunner, TaskQueue};

/// Built once in `main` and cloned per request by axum
#[derive(Clone)]
pub struct AppState {
    /// Answers synchronous chat calls
    pub(crate) runner: Arc<dyn ChatRunner>,
    /// Background chat tasks
    pub(crate) tasks: TaskQueue,
}

impl AppState {
    /// Both paths share one runner so sync and queued calls behave the same
    pub fn new(runner: Arc<dyn ChatRunner>) -> Self {
        let tasks = TaskQueue::new(runner.clone());
        Self { runner, tasks }
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }
}
