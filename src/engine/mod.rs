// ABOUTME: Task scheduling engine module
// ABOUTME: Priority queue, dependency tracking, retry policy, and the worker pool scheduler

pub mod dependency;
pub mod error;
pub mod queue;
pub mod retry;
pub mod scheduler;
pub mod task;

pub use dependency::DependencyTracker;
pub use error::{Result, SchedulerError, TaskError, TaskErrorKind};
pub use queue::ReadyQueue;
pub use retry::RetryPolicy;
pub use scheduler::{SchedulerBuilder, SchedulerStats, TaskScheduler};
pub use task::{Task, TaskFuture, TaskOutput, TaskState, TaskStatus};
