// ABOUTME: Dependency tracking for tasks blocked on incomplete dependencies
// ABOUTME: Maps each pending dependency id to the set of task ids waiting on it

use std::collections::{HashMap, HashSet};

/// Tracks which tasks are blocked on which dependencies. A blocked task is
/// registered under every one of its unsatisfied dependency ids at once
/// (fan-out registration); completion of a dependency removes that
/// dependency's entry wholesale and surfaces the candidates for release.
#[derive(Debug, Default)]
pub struct DependencyTracker {
    waiting_on: HashMap<String, HashSet<String>>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `task_id` as blocked on every id in `unsatisfied`.
    pub fn register(&mut self, task_id: &str, unsatisfied: &HashSet<String>) {
        for dep_id in unsatisfied {
            self.waiting_on
                .entry(dep_id.clone())
                .or_default()
                .insert(task_id.to_string());
        }
    }

    /// Remove and return the tasks that were blocked on `completed_id`.
    /// Callers must still verify that each candidate's remaining
    /// dependencies are satisfied before releasing it.
    pub fn on_completed(&mut self, completed_id: &str) -> HashSet<String> {
        self.waiting_on.remove(completed_id).unwrap_or_default()
    }

    pub fn has_dependents(&self, dep_id: &str) -> bool {
        self.waiting_on
            .get(dep_id)
            .is_some_and(|dependents| !dependents.is_empty())
    }

    /// Number of distinct tasks currently blocked on at least one dependency.
    pub fn blocked_count(&self) -> usize {
        self.waiting_on
            .values()
            .flatten()
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting_on.is_empty()
    }
}
