// ABOUTME: Priority-ordered ready queue handing tasks off to workers
// ABOUTME: Async blocking pop backed by a binary heap, a semaphore, and a FIFO tie-break

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use tokio::sync::{Mutex, Semaphore};

#[derive(Debug, PartialEq, Eq)]
struct QueueEntry {
    priority: i32,
    seq: u64,
    task_id: String,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Highest priority first; among equal priorities the lowest sequence
        // number (earliest push) wins, giving a strict total order.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Handoff structure between submitters and workers. `pop` suspends while
/// the queue is empty; each `push` wakes exactly one suspended popper.
pub struct ReadyQueue {
    heap: Mutex<BinaryHeap<QueueEntry>>,
    items: Semaphore,
    seq: AtomicU64,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            items: Semaphore::new(0),
            seq: AtomicU64::new(0),
        }
    }

    pub async fn push(&self, priority: i32, task_id: String) {
        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        self.heap.lock().await.push(QueueEntry {
            priority,
            seq,
            task_id,
        });
        self.items.add_permits(1);
    }

    /// Insert every entry under one heap lock before releasing any permit,
    /// so a woken popper always sees the full batch. Used when one
    /// completion unblocks several dependents at once.
    pub async fn push_all(&self, entries: Vec<(i32, String)>) {
        let count = entries.len();
        if count == 0 {
            return;
        }
        {
            let mut heap = self.heap.lock().await;
            for (priority, task_id) in entries {
                let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
                heap.push(QueueEntry {
                    priority,
                    seq,
                    task_id,
                });
            }
        }
        self.items.add_permits(count);
    }

    /// Remove and return the highest-priority task id, suspending while the
    /// queue is empty.
    pub async fn pop(&self) -> String {
        let permit = self.items.acquire().await.expect("Semaphore closed");
        permit.forget();

        // A permit is only issued after its entry is in the heap.
        self.heap
            .lock()
            .await
            .pop()
            .map(|entry| entry.task_id)
            .expect("ready queue permit issued without an entry")
    }

    pub async fn len(&self) -> usize {
        self.heap.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.heap.lock().await.is_empty()
    }
}

impl Default for ReadyQueue {
    fn default() -> Self {
        Self::new()
    }
}
