// ABOUTME: Resource tracker collaborator interface for bounding task execution
// ABOUTME: A tracker may veto a task attempt with a resource limit error

use async_trait::async_trait;
use thiserror::Error;

use crate::engine::error::TaskError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Resource error for '{resource}': {message}")]
pub struct ResourceError {
    pub resource: String,
    pub message: String,
}

impl ResourceError {
    pub fn new(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            message: message.into(),
        }
    }
}

impl From<ResourceError> for TaskError {
    fn from(err: ResourceError) -> Self {
        TaskError::resource(err.message).with_cause(format!("resource '{}'", err.resource))
    }
}

/// External collaborator that bounds task execution. `acquire` runs before
/// each task attempt and may veto it; the scheduler treats a veto as an
/// ordinary task failure, subject to the task's retry policy. `release`
/// runs after the attempt regardless of outcome.
///
/// Implementations are invoked concurrently from all workers.
#[async_trait]
pub trait ResourceTracker: Send + Sync {
    async fn acquire(&self) -> Result<(), ResourceError>;

    fn release(&self) {}
}

/// Default tracker that never vetoes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResourceTracker;

#[async_trait]
impl ResourceTracker for NoopResourceTracker {
    async fn acquire(&self) -> Result<(), ResourceError> {
        Ok(())
    }
}
