// ABOUTME: Task scheduler owning the ready queue, dependency tracker, and worker pool
// ABOUTME: Drives task execution, retry with backoff, dependency release, and statistics

use chrono::Utc;
use futures::FutureExt;
use serde_json::json;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::dependency::DependencyTracker;
use super::error::{Result, SchedulerError, TaskError};
use super::queue::ReadyQueue;
use super::retry::RetryPolicy;
use super::task::{Task, TaskFn, TaskOutput, TaskState, TaskStatus};
use crate::resources::{NoopResourceTracker, ResourceTracker};
use crate::telemetry::{NoopTelemetry, TelemetryLevel, TelemetrySink};

const TELEMETRY_SOURCE: &str = "scheduler";

/// Scheduler-owned record for one submitted task.
struct TaskRecord {
    payload: TaskFn,
    priority: i32,
    dependencies: HashSet<String>,
    retry_policy: Option<RetryPolicy>,
    state: TaskState,
}

/// All bookkeeping mutated by workers and submitters, guarded by a single
/// mutex. The lock is never held across a payload await or a backoff sleep.
#[derive(Default)]
struct SchedulerState {
    tasks: HashMap<String, TaskRecord>,
    running: HashSet<String>,
    completed: HashSet<String>,
    failed: HashSet<String>,
    waiting: DependencyTracker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Tasks sitting in the ready queue.
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    /// Tasks ever submitted to this scheduler instance.
    pub total: usize,
}

struct SchedulerInner {
    state: Mutex<SchedulerState>,
    queue: ReadyQueue,
    resource_tracker: Arc<dyn ResourceTracker>,
    telemetry: Arc<dyn TelemetrySink>,
    shutdown: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
    stopped: AtomicBool,
    idle: Notify,
}

/// Priority task scheduler with dependency gating and retry support.
///
/// Cloning is cheap; all clones share the same scheduler instance.
#[derive(Clone)]
pub struct TaskScheduler {
    inner: Arc<SchedulerInner>,
}

pub struct SchedulerBuilder {
    resource_tracker: Arc<dyn ResourceTracker>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl SchedulerBuilder {
    pub fn with_resource_tracker(mut self, tracker: Arc<dyn ResourceTracker>) -> Self {
        self.resource_tracker = tracker;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn build(self) -> TaskScheduler {
        let (shutdown, _) = watch::channel(false);

        TaskScheduler {
            inner: Arc::new(SchedulerInner {
                state: Mutex::new(SchedulerState::default()),
                queue: ReadyQueue::new(),
                resource_tracker: self.resource_tracker,
                telemetry: self.telemetry,
                shutdown,
                workers: Mutex::new(Vec::new()),
                started: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                idle: Notify::new(),
            }),
        }
    }
}

impl TaskScheduler {
    /// Create a scheduler with no-op collaborators.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder {
            resource_tracker: Arc::new(NoopResourceTracker),
            telemetry: Arc::new(NoopTelemetry),
        }
    }

    /// Spawn exactly `max_workers` long-lived workers. Calling `start` on an
    /// already-started scheduler is a no-op; a stopped scheduler cannot be
    /// restarted.
    pub async fn start(&self, max_workers: usize) -> Result<()> {
        if self.inner.stopped.load(Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyStopped);
        }
        if self.inner.started.swap(true, Ordering::SeqCst) {
            debug!("Scheduler already started, ignoring start()");
            return Ok(());
        }

        let mut workers = self.inner.workers.lock().await;
        for worker_id in 0..max_workers {
            let inner = Arc::clone(&self.inner);
            workers.push(tokio::spawn(worker_loop(inner, worker_id)));
        }

        info!("Scheduler started with {} workers", max_workers);
        Ok(())
    }

    /// Signal all workers to exit after their current task attempt and wait
    /// for them to finish. Idempotent. Tasks still queued or waiting are
    /// left in their last state.
    pub async fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            debug!("Scheduler already stopped");
        }
        self.inner.shutdown.send_replace(true);

        let mut workers = self.inner.workers.lock().await;
        for handle in workers.drain(..) {
            if let Err(e) = handle.await {
                error!("Worker join error: {}", e);
            }
        }
        info!("Scheduler stopped");
    }

    /// Submit a task for execution. Tasks with unsatisfied dependencies are
    /// parked until every dependency completes; everything else enters the
    /// ready queue keyed by priority.
    pub async fn submit(&self, task: Task) -> Result<()> {
        if self.inner.stopped.load(Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyStopped);
        }
        if !self.inner.started.load(Ordering::SeqCst) {
            return Err(SchedulerError::NotStarted);
        }
        if task.id.is_empty() {
            return Err(SchedulerError::InvalidTask {
                reason: "task id must not be empty".to_string(),
            });
        }
        if task.dependencies.contains(&task.id) {
            return Err(SchedulerError::InvalidTask {
                reason: format!("task '{}' depends on itself", task.id),
            });
        }

        let Task {
            id,
            payload,
            priority,
            dependencies,
            retry_policy,
        } = task;

        let mut record = TaskRecord {
            payload,
            priority,
            dependencies,
            retry_policy,
            state: TaskState::new(id.clone(), priority),
        };

        let enqueue = {
            let mut state = self.inner.state.lock().await;

            let unsatisfied: HashSet<String> = record
                .dependencies
                .iter()
                .filter(|dep_id| !state.completed.contains(*dep_id))
                .cloned()
                .collect();

            let enqueue = unsatisfied.is_empty();
            if !enqueue {
                record.state.status = TaskStatus::Waiting;
                state.waiting.register(&id, &unsatisfied);
                debug!(
                    "Task {} waiting on {} unsatisfied dependencies",
                    id,
                    unsatisfied.len()
                );
            }

            if state.tasks.insert(id.clone(), record).is_some() {
                warn!("Task id {} resubmitted, overwriting previous bookkeeping", id);
            }
            enqueue
        };

        if enqueue {
            self.inner.queue.push(priority, id.clone()).await;
        }

        self.inner.telemetry.emit(
            "task_submitted",
            json!({ "task_id": id, "priority": priority }),
            TELEMETRY_SOURCE,
            TelemetryLevel::Info,
        );
        Ok(())
    }

    /// Read-only snapshot of a task's runtime state.
    pub async fn get_task(&self, task_id: &str) -> Option<TaskState> {
        let state = self.inner.state.lock().await;
        state.tasks.get(task_id).map(|record| record.state.clone())
    }

    /// Immutable snapshot of aggregate counts.
    pub async fn stats(&self) -> SchedulerStats {
        let pending = self.inner.queue.len().await;
        let state = self.inner.state.lock().await;
        SchedulerStats {
            pending,
            running: state.running.len(),
            completed: state.completed.len(),
            failed: state.failed.len(),
            total: state.tasks.len(),
        }
    }

    /// Suspend until no task is queued, pending, or running. Tasks parked on
    /// a dependency that will never complete do not block this.
    pub async fn wait_for_completion(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_idle().await {
                return;
            }
            notified.await;
        }
    }

    async fn is_idle(&self) -> bool {
        if self.inner.queue.len().await > 0 {
            return false;
        }
        let state = self.inner.state.lock().await;
        state.running.is_empty()
            && !state.tasks.values().any(|record| {
                matches!(
                    record.state.status,
                    TaskStatus::Pending | TaskStatus::Running
                )
            })
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn worker_loop(inner: Arc<SchedulerInner>, worker_id: usize) {
    let mut shutdown = inner.shutdown.subscribe();
    debug!("Worker {} started", worker_id);

    loop {
        // Covers a shutdown signalled before this worker subscribed.
        if *shutdown.borrow() {
            break;
        }

        let task_id = tokio::select! {
            _ = shutdown.changed() => break,
            task_id = inner.queue.pop() => task_id,
        };

        execute_task(&inner, &mut shutdown, &task_id).await;

        if *shutdown.borrow() {
            break;
        }
    }

    debug!("Worker {} exited", worker_id);
}

/// Run one attempt of a task and record its outcome. Never propagates an
/// error; payload failures and panics are absorbed into the task record.
async fn execute_task(
    inner: &Arc<SchedulerInner>,
    shutdown: &mut watch::Receiver<bool>,
    task_id: &str,
) {
    let (payload, priority, retry_policy, retry_count) = {
        let mut state = inner.state.lock().await;
        let Some(record) = state.tasks.get_mut(task_id) else {
            error!("Popped unknown task id {}", task_id);
            return;
        };

        record.state.status = TaskStatus::Running;
        record.state.started_time = Some(Utc::now());
        let snapshot = (
            Arc::clone(&record.payload),
            record.priority,
            record.retry_policy.clone(),
            record.state.retry_count,
        );
        state.running.insert(task_id.to_string());
        snapshot
    };

    debug!("Executing task {} (attempt {})", task_id, retry_count + 1);

    let attempt = match inner.resource_tracker.acquire().await {
        Ok(()) => {
            let outcome = AssertUnwindSafe((payload)()).catch_unwind().await;
            inner.resource_tracker.release();
            match outcome {
                Ok(result) => result,
                Err(panic) => Err(TaskError::panic(panic_message(panic))),
            }
        }
        Err(veto) => {
            warn!("Resource tracker vetoed task {}: {}", task_id, veto);
            Err(TaskError::from(veto))
        }
    };

    match attempt {
        Ok(output) => complete_task(inner, task_id, output).await,
        Err(err) => {
            fail_or_retry(inner, shutdown, task_id, priority, retry_policy, retry_count, err).await
        }
    }

    inner.idle.notify_waiters();
}

async fn complete_task(inner: &Arc<SchedulerInner>, task_id: &str, output: TaskOutput) {
    let released = {
        let mut state = inner.state.lock().await;

        if let Some(record) = state.tasks.get_mut(task_id) {
            record.state.status = TaskStatus::Completed;
            record.state.result = output;
            record.state.completed_time = Some(Utc::now());
        }
        state.running.remove(task_id);
        state.completed.insert(task_id.to_string());

        // Release dependents whose last unsatisfied dependency just
        // completed; the rest stay registered under their other
        // dependencies.
        let candidates = state.waiting.on_completed(task_id);
        let mut released = Vec::new();
        for dep_id in candidates {
            let ready = state.tasks.get(&dep_id).is_some_and(|record| {
                record
                    .dependencies
                    .iter()
                    .all(|dep| state.completed.contains(dep))
            });
            if ready {
                if let Some(record) = state.tasks.get_mut(&dep_id) {
                    record.state.status = TaskStatus::Pending;
                    released.push((record.priority, dep_id));
                }
            }
        }
        released
    };

    for (_, dep_id) in &released {
        debug!("Dependency release: task {} is now runnable", dep_id);
    }
    // The whole batch must be queued before any worker is woken, so the
    // highest-priority released dependent is always popped first.
    inner.queue.push_all(released).await;

    info!("Task {} completed", task_id);
    inner.telemetry.emit(
        "task_completed",
        json!({ "task_id": task_id }),
        TELEMETRY_SOURCE,
        TelemetryLevel::Info,
    );
}

async fn fail_or_retry(
    inner: &Arc<SchedulerInner>,
    shutdown: &mut watch::Receiver<bool>,
    task_id: &str,
    priority: i32,
    retry_policy: Option<RetryPolicy>,
    retry_count: u32,
    err: TaskError,
) {
    match retry_policy {
        Some(policy) if retry_count < policy.max_retries => {
            let delay = policy.delay_for(retry_count);
            {
                let mut state = inner.state.lock().await;
                state.running.remove(task_id);
                if let Some(record) = state.tasks.get_mut(task_id) {
                    record.state.retry_count += 1;
                    record.state.completed_time = Some(Utc::now());
                    record.state.status = TaskStatus::Pending;
                }
            }

            warn!(
                "Task {} failed, retrying in {:?} (attempt {}/{}): {}",
                task_id,
                delay,
                retry_count + 1,
                policy.max_retries,
                err
            );

            // The backoff sleeps outside any lock. Shutdown cuts the sleep
            // short; the task is re-queued but not executed.
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {}
            }
            inner.queue.push(priority, task_id.to_string()).await;
        }
        _ => {
            {
                let mut state = inner.state.lock().await;
                state.running.remove(task_id);
                state.failed.insert(task_id.to_string());
                if let Some(record) = state.tasks.get_mut(task_id) {
                    record.state.status = TaskStatus::Failed;
                    record.state.completed_time = Some(Utc::now());
                    record.state.error = Some(err.clone());
                }
                if state.waiting.has_dependents(task_id) {
                    warn!(
                        "Task {} failed with dependents still waiting on it; they will not be released",
                        task_id
                    );
                }
            }

            error!(
                "Task {} failed permanently after {} retries: {}",
                task_id, retry_count, err
            );
            inner.telemetry.emit(
                "task_failed",
                json!({
                    "task_id": task_id,
                    "error": err.to_string(),
                    "retries": retry_count,
                }),
                TELEMETRY_SOURCE,
                TelemetryLevel::Error,
            );
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "task payload panicked".to_string()
    }
}
