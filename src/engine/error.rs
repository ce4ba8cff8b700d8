// ABOUTME: Error types for scheduler operations and task failures
// ABOUTME: Defines synchronous API errors and the tagged task error payload

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Scheduler not started - call start() before submitting tasks")]
    NotStarted,

    #[error("Scheduler already stopped and cannot be restarted")]
    AlreadyStopped,

    #[error("Invalid task: {reason}")]
    InvalidTask { reason: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Classification of a task failure, independent of any concrete error type
/// the payload may have raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    Execution,
    Resource,
    Panic,
}

impl fmt::Display for TaskErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskErrorKind::Execution => write!(f, "execution"),
            TaskErrorKind::Resource => write!(f, "resource"),
            TaskErrorKind::Panic => write!(f, "panic"),
        }
    }
}

/// Tagged failure payload stored on a failed task. Kept serializable so
/// downstream consumers can inspect failures without knowing the concrete
/// error type the payload produced.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{kind} error: {message}")]
pub struct TaskError {
    pub kind: TaskErrorKind,
    pub message: String,
    pub cause: Option<String>,
}

impl TaskError {
    pub fn new(kind: TaskErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Execution, message)
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Resource, message)
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Panic, message)
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_error_display() {
        let err = TaskError::execution("command exited with status 1");
        assert_eq!(
            err.to_string(),
            "execution error: command exited with status 1"
        );
        assert_eq!(err.kind, TaskErrorKind::Execution);
        assert!(err.cause.is_none());
    }

    #[test]
    fn test_task_error_cause() {
        let err = TaskError::resource("memory limit exceeded").with_cause("resource 'memory'");
        assert_eq!(err.cause.as_deref(), Some("resource 'memory'"));
    }

    #[test]
    fn test_task_error_round_trips_through_json() {
        let err = TaskError::panic("index out of bounds");
        let json = serde_json::to_string(&err).unwrap();
        let back: TaskError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
