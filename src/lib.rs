// ABOUTME: Main library module for the taskweave task scheduler
// ABOUTME: Exports the scheduling engine and its collaborator interfaces

pub mod engine;
pub mod resources;
pub mod telemetry;

// Re-export commonly used types
pub use engine::{
    RetryPolicy, SchedulerError, SchedulerStats, Task, TaskError, TaskErrorKind, TaskScheduler,
    TaskState, TaskStatus,
};
pub use resources::{NoopResourceTracker, ResourceError, ResourceTracker};
pub use telemetry::{
    LogTelemetry, MemoryTelemetry, NoopTelemetry, TelemetryEvent, TelemetryLevel, TelemetrySink,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
