// ABOUTME: Task definition, status state machine, and observable state snapshots
// ABOUTME: Wraps an async payload with identity, priority, dependencies, and retry policy

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::error::TaskError;
use super::retry::RetryPolicy;

/// Opaque output of a task payload.
pub type TaskOutput = Option<String>;

pub type TaskFuture = BoxFuture<'static, std::result::Result<TaskOutput, TaskError>>;

// Stored as a shared callable so retries can re-invoke the payload.
pub(crate) type TaskFn = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Waiting,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Waiting => write!(f, "waiting"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A unit of schedulable work. The scheduler takes exclusive ownership at
/// submission; callers observe progress through [`TaskState`] snapshots.
///
/// Task ids are caller-assigned and assumed unique - submitting a duplicate
/// id silently overwrites the bookkeeping for the previous task.
pub struct Task {
    pub id: String,
    pub(crate) payload: TaskFn,
    pub priority: i32,
    pub dependencies: HashSet<String>,
    pub retry_policy: Option<RetryPolicy>,
}

impl Task {
    pub fn new<F, Fut>(id: impl Into<String>, payload: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<TaskOutput, TaskError>> + Send + 'static,
    {
        Self {
            id: id.into(),
            payload: Arc::new(move || Box::pin(payload())),
            priority: 0,
            dependencies: HashSet::new(),
            retry_policy: None,
        }
    }

    /// Higher priority tasks are scheduled sooner. Defaults to 0.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.insert(dependency.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("dependencies", &self.dependencies)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

/// Read-only snapshot of a task's runtime state, returned by
/// `TaskScheduler::get_task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskState {
    pub task_id: String,
    pub status: TaskStatus,
    pub priority: i32,
    pub result: Option<String>,
    pub error: Option<TaskError>,
    pub retry_count: u32,
    pub scheduled_time: DateTime<Utc>,
    pub started_time: Option<DateTime<Utc>>,
    pub completed_time: Option<DateTime<Utc>>,
}

impl TaskState {
    pub(crate) fn new(task_id: String, priority: i32) -> Self {
        Self {
            task_id,
            status: TaskStatus::Pending,
            priority,
            result: None,
            error: None,
            retry_count: 0,
            scheduled_time: Utc::now(),
            started_time: None,
            completed_time: None,
        }
    }

    /// Wall-clock duration of the last attempt, once both timestamps are set.
    pub fn duration(&self) -> Option<Duration> {
        match (self.completed_time, self.started_time) {
            (Some(completed), Some(started)) => (completed - started).to_std().ok(),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}
