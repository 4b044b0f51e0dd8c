//! Pipeline Module - authoring and the frozen task graph
//!
//! - `builder`: single-pass authoring (`PipelineBuilder`, `TaskHandle`)
//! - `task`: bound invocations (`Task`, `ArgumentRef`, `OutputRef`)
//! - `manifest`: portable compiled representation (`PipelineManifest`)

mod builder;
pub mod manifest;
mod task;

pub use builder::{PipelineBuilder, TaskHandle};
pub use manifest::PipelineManifest;
pub use task::{ArgumentRef, OutputRef, Task};

use std::sync::Arc;

use rustc_hash::FxHashMap;

/// A frozen set of bound tasks, produced by `PipelineBuilder::finish()`
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    tasks: Vec<Arc<Task>>,
    by_id: FxHashMap<Arc<str>, Arc<Task>>,
}

impl Pipeline {
    pub(crate) fn new(name: String, tasks: Vec<Arc<Task>>) -> Self {
        let by_id = tasks
            .iter()
            .map(|t| (Arc::clone(&t.id), Arc::clone(t)))
            .collect();
        Self { name, tasks, by_id }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tasks in authoring order
    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Arc<Task>> {
        self.by_id.get(id)
    }

    /// Structural fingerprint of the pipeline (xxh3, 16 hex chars).
    ///
    /// Covers the name, task ids, component names, and the shape of every
    /// argument binding; identical authoring code yields identical
    /// fingerprints across runs.
    pub fn fingerprint(&self) -> String {
        use xxhash_rust::xxh3::xxh3_64;

        let mut hasher_input = String::new();
        hasher_input.push_str(&self.name);
        hasher_input.push_str(&self.tasks.len().to_string());
        for task in &self.tasks {
            hasher_input.push_str(&task.id);
            hasher_input.push_str(task.component.name());

            // Sorted for independence from map iteration order
            let mut keys: Vec<&String> = task.arguments.keys().collect();
            keys.sort();
            for key in keys {
                hasher_input.push_str(key);
                match &task.arguments[key] {
                    ArgumentRef::Literal(v) => hasher_input.push_str(&v.to_string()),
                    ArgumentRef::Output(r) => {
                        hasher_input.push_str(&r.task);
                        hasher_input.push_str(&r.output);
                    }
                }
            }
        }

        format!("{:016x}", xxh3_64(hasher_input.as_bytes()))
    }
}
