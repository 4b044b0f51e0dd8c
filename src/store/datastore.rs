//! DataStore - task output storage with DashMap
//!
//! Single map design with lock-free concurrent access. Each task settles
//! exactly once (success, failure, or skip); dependents only become ready
//! after their producers' results are visible here, which is the
//! happens-before edge the runtime relies on.

use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use dashmap::DashMap;
use rustc_hash::FxHashMap;

/// Task execution status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Success,
    Failed(String),
    /// Never ran: a transitive producer failed or was skipped
    Skipped { cause: Arc<str> },
}

/// Task execution result (unified storage)
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Value outputs in canonical string form, keyed by raw port name
    pub values: FxHashMap<String, String>,
    /// Artifact output paths, keyed by raw port name
    pub artifacts: FxHashMap<String, Utf8PathBuf>,
    /// Execution duration (zero for skipped tasks)
    pub duration: Duration,
    pub status: TaskStatus,
}

impl TaskResult {
    /// Create a successful result
    pub fn success(
        values: FxHashMap<String, String>,
        artifacts: FxHashMap<String, Utf8PathBuf>,
        duration: Duration,
    ) -> Self {
        Self {
            values,
            artifacts,
            duration,
            status: TaskStatus::Success,
        }
    }

    /// Create a failed result
    pub fn failed(error: impl Into<String>, duration: Duration) -> Self {
        Self {
            values: FxHashMap::default(),
            artifacts: FxHashMap::default(),
            duration,
            status: TaskStatus::Failed(error.into()),
        }
    }

    /// Create a skipped result, naming the task whose failure caused the skip
    pub fn skipped(cause: Arc<str>) -> Self {
        Self {
            values: FxHashMap::default(),
            artifacts: FxHashMap::default(),
            duration: Duration::ZERO,
            status: TaskStatus::Skipped { cause },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, TaskStatus::Success)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, TaskStatus::Skipped { .. })
    }

    /// Get error message if failed
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            TaskStatus::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Canonical string of a value output
    pub fn value(&self, port: &str) -> Option<&str> {
        self.values.get(port).map(String::as_str)
    }

    /// Path of an artifact output
    pub fn artifact(&self, port: &str) -> Option<&Utf8Path> {
        self.artifacts.get(port).map(Utf8PathBuf::as_path)
    }
}

/// Thread-safe storage for task results (lock-free)
///
/// Uses Arc<str> keys for zero-cost cloning with the same Arc used in events.
#[derive(Clone, Default)]
pub struct DataStore {
    results: Arc<DashMap<Arc<str>, TaskResult>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task result (accepts Arc<str> for zero-cost key reuse)
    pub fn insert(&self, task_id: Arc<str>, result: TaskResult) {
        self.results.insert(task_id, result);
    }

    /// Get a task result
    pub fn get(&self, task_id: &str) -> Option<TaskResult> {
        self.results.get(task_id).map(|r| r.value().clone())
    }

    /// Whether the task has settled (success, failure, or skip)
    pub fn contains(&self, task_id: &str) -> bool {
        self.results.contains_key(task_id)
    }

    /// Check if task succeeded
    pub fn is_success(&self, task_id: &str) -> bool {
        self.results
            .get(task_id)
            .is_some_and(|r| r.value().is_success())
    }

    /// Canonical string of a task's value output
    pub fn value(&self, task_id: &str, port: &str) -> Option<String> {
        self.results
            .get(task_id)
            .and_then(|r| r.value().values.get(port).cloned())
    }

    /// Path of a task's artifact output
    pub fn artifact(&self, task_id: &str, port: &str) -> Option<Utf8PathBuf> {
        self.results
            .get(task_id)
            .and_then(|r| r.value().artifacts.get(port).cloned())
    }

    /// Number of settled tasks
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Snapshot of all settled results
    pub fn snapshot(&self) -> FxHashMap<Arc<str>, TaskResult> {
        self.results
            .iter()
            .map(|entry| (Arc::clone(entry.key()), entry.value().clone()))
            .collect()
    }
}
