// ABOUTME: Telemetry sink collaborator interface and built-in sinks
// ABOUTME: Records scheduler events best-effort for observability

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for TelemetryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryLevel::Debug => write!(f, "debug"),
            TelemetryLevel::Info => write!(f, "info"),
            TelemetryLevel::Warn => write!(f, "warn"),
            TelemetryLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
    pub source: String,
    pub level: TelemetryLevel,
}

/// External collaborator recording scheduler events. Calls are best-effort:
/// implementations must not block and must swallow their own failures.
/// Invoked concurrently from all workers.
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event_type: &str, data: Value, source: &str, level: TelemetryLevel);
}

/// Default sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn emit(&self, _event_type: &str, _data: Value, _source: &str, _level: TelemetryLevel) {}
}

/// Sink that forwards events to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl TelemetrySink for LogTelemetry {
    fn emit(&self, event_type: &str, data: Value, source: &str, level: TelemetryLevel) {
        match level {
            TelemetryLevel::Debug => {
                debug!("Telemetry event: {} from {}: {}", event_type, source, data)
            }
            TelemetryLevel::Info => {
                info!("Telemetry event: {} from {}: {}", event_type, source, data)
            }
            TelemetryLevel::Warn => {
                warn!("Telemetry event: {} from {}: {}", event_type, source, data)
            }
            TelemetryLevel::Error => {
                error!("Telemetry event: {} from {}: {}", event_type, source, data)
            }
        }
    }
}

/// Sink that buffers events in memory, mainly for tests and short-lived
/// diagnostics.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count_of(&self, event_type: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event.event_type == event_type)
            .count()
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn emit(&self, event_type: &str, data: Value, source: &str, level: TelemetryLevel) {
        // Best-effort: a poisoned lock drops the event rather than panicking.
        if let Ok(mut events) = self.events.lock() {
            events.push(TelemetryEvent {
                event_type: event_type.to_string(),
                timestamp: Utc::now(),
                data,
                source: source.to_string(),
                level,
            });
        }
    }
}
