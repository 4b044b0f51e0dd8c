//! EventLog - append-only run audit trail
//!
//! - Event: envelope with id + timestamp + kind
//! - EventKind: pipeline-level and task-level variants
//! - EventLog: thread-safe, append-only log

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single event in the run log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence id (for ordering)
    pub id: u64,
    /// Time since run start (ms)
    pub timestamp_ms: u64,
    /// Event type and data
    pub kind: EventKind,
}

/// All possible event types
///
/// Uses Arc<str> for task_id fields to enable zero-cost cloning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════
    // PIPELINE LEVEL
    // ═══════════════════════════════════════════
    PipelineStarted {
        task_count: usize,
        /// Unique id for this execution
        run_id: String,
        /// Structural fingerprint of the compiled pipeline
        fingerprint: String,
        /// Runtime version
        version: String,
    },
    PipelineCompleted {
        completed: usize,
        failed: usize,
        skipped: usize,
        total_duration_ms: u64,
    },
    PipelineCancelled {
        /// Tasks that were never dispatched
        pending: usize,
    },
    PipelineFailed {
        error: String,
        failed_task: Option<Arc<str>>,
    },

    // ═══════════════════════════════════════════
    // TASK LEVEL
    // ═══════════════════════════════════════════
    TaskScheduled {
        task_id: Arc<str>,
        dependencies: Vec<Arc<str>>,
    },
    /// Task execution begins with its staged inputs
    TaskStarted {
        task_id: Arc<str>,
        /// Serialized args and artifact paths the unit receives
        inputs: Value,
    },
    TaskCompleted {
        task_id: Arc<str>,
        duration_ms: u64,
    },
    TaskFailed {
        task_id: Arc<str>,
        error: String,
        duration_ms: u64,
    },
    /// Task never ran: a transitive producer failed or was skipped
    TaskSkipped {
        task_id: Arc<str>,
        cause: Arc<str>,
    },
}

impl EventKind {
    /// Extract task_id if event is task-related
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::TaskScheduled { task_id, .. }
            | Self::TaskStarted { task_id, .. }
            | Self::TaskCompleted { task_id, .. }
            | Self::TaskFailed { task_id, .. }
            | Self::TaskSkipped { task_id, .. } => Some(task_id),
            _ => None,
        }
    }
}

struct Inner {
    events: RwLock<Vec<Event>>,
    next_id: AtomicU64,
    start: Instant,
}

/// Thread-safe, append-only event log (cheap to clone, shared)
#[derive(Clone)]
pub struct EventLog {
    inner: Arc<Inner>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                events: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(0),
                start: Instant::now(),
            }),
        }
    }

    /// Append an event; ids are monotonic, timestamps relative to creation
    pub fn emit(&self, kind: EventKind) {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let timestamp_ms = self.inner.start.elapsed().as_millis() as u64;
        self.inner.events.write().push(Event {
            id,
            timestamp_ms,
            kind,
        });
    }

    /// Snapshot of all events so far
    pub fn events(&self) -> Vec<Event> {
        self.inner.events.read().clone()
    }

    /// Events belonging to one task
    pub fn filter_task(&self, task_id: &str) -> Vec<Event> {
        self.inner
            .events
            .read()
            .iter()
            .filter(|e| e.kind.task_id() == Some(task_id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.events.read().is_empty()
    }

    /// Serialize the whole log to a JSON array
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.events()).unwrap_or(Value::Null)
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
