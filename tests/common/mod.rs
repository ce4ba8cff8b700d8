// ABOUTME: Common helpers for scheduler integration tests
// ABOUTME: Payload builders and collaborator fakes shared across test files

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use taskweave::{ResourceError, ResourceTracker, Task, TaskError};

/// Route scheduler logs through a test subscriber. Safe to call from every
/// test; only the first call installs the subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Task that succeeds immediately with the given output.
pub fn ok_task(id: &str, output: &str) -> Task {
    let output = output.to_string();
    Task::new(id, move || {
        let output = output.clone();
        async move { Ok(Some(output)) }
    })
}

/// Task that always fails with an execution error.
pub fn failing_task(id: &str, message: &str) -> Task {
    let message = message.to_string();
    Task::new(id, move || {
        let message = message.clone();
        async move { Err(TaskError::execution(message)) }
    })
}

/// Task that always fails and counts how often it was attempted.
pub fn counting_failing_task(id: &str, attempts: Arc<AtomicU32>) -> Task {
    Task::new(id, move || {
        let attempts = Arc::clone(&attempts);
        async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(TaskError::execution("always fails"))
        }
    })
}

/// Task that fails its first `fail_times` attempts and then succeeds.
pub fn flaky_task(id: &str, fail_times: u32, attempts: Arc<AtomicU32>) -> Task {
    Task::new(id, move || {
        let attempts = Arc::clone(&attempts);
        async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < fail_times {
                Err(TaskError::execution("transient failure"))
            } else {
                Ok(Some("recovered".to_string()))
            }
        }
    })
}

/// Task that sleeps for the given duration before succeeding.
pub fn sleeping_task(id: &str, delay: Duration) -> Task {
    Task::new(id, move || async move {
        tokio::time::sleep(delay).await;
        Ok(None)
    })
}

/// Task that records its own id in the shared log when it runs.
pub fn recording_task(id: &str, log: Arc<Mutex<Vec<String>>>) -> Task {
    let task_id = id.to_string();
    Task::new(id, move || {
        let log = Arc::clone(&log);
        let task_id = task_id.clone();
        async move {
            log.lock().unwrap().push(task_id);
            Ok(None)
        }
    })
}

/// Task that records its id after sleeping, for ordering assertions on
/// longer-running work.
pub fn slow_recording_task(id: &str, delay: Duration, log: Arc<Mutex<Vec<String>>>) -> Task {
    let task_id = id.to_string();
    Task::new(id, move || {
        let log = Arc::clone(&log);
        let task_id = task_id.clone();
        async move {
            tokio::time::sleep(delay).await;
            log.lock().unwrap().push(task_id);
            Ok(None)
        }
    })
}

/// Task that suspends until the gate is notified, then succeeds. Used to
/// keep a worker busy while more tasks are queued behind it.
pub fn gated_task(id: &str, gate: Arc<tokio::sync::Notify>) -> Task {
    Task::new(id, move || {
        let gate = Arc::clone(&gate);
        async move {
            gate.notified().await;
            Ok(None)
        }
    })
}

/// Resource tracker that vetoes every acquisition and counts attempts.
#[derive(Debug, Default)]
pub struct VetoTracker {
    pub acquires: AtomicU32,
}

#[async_trait]
impl ResourceTracker for VetoTracker {
    async fn acquire(&self) -> Result<(), ResourceError> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        Err(ResourceError::new("memory", "limit exceeded"))
    }
}
