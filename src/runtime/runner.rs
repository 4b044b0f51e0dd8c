//! Runner - plan execution with tokio
//!
//! Ready-loop scheduling: each round collects tasks whose producers all
//! succeeded, dispatches them into a JoinSet (independent branches run
//! concurrently), and settles results before the next round. Binding
//! completes inside the spawned task before its unit runs, and a producer's
//! result is visible in the datastore before any dependent becomes ready -
//! the strict happens-before edge per graph edge.
//!
//! Failure semantics: a failed task fails alone; everything transitively
//! downstream is marked skipped and never dispatched; independent branches
//! continue. No automatic retries.
//!
//! Cancellation: not-yet-started tasks are simply never dispatched; running
//! units are signaled best-effort through their `CancellationToken`, and a
//! cancelled task settles as failed so nothing downstream consumes partial
//! output.

use std::sync::Arc;
use std::time::Instant;

use camino::Utf8Path;
use rustc_hash::FxHashMap;
use serde_json::{json, Value};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::binding::{bind_arguments, capture_outputs};
use crate::codec::CodecRegistry;
use crate::component::Invocation;
use crate::dag::{compile, ExecutionPlan};
use crate::error::{ConveyorError, Result};
use crate::event::{EventKind, EventLog};
use crate::pipeline::{Pipeline, Task};
use crate::store::{ArtifactStore, DataStore, TaskResult};

/// Per-task outcome of a finished run
#[derive(Debug)]
pub struct RunSummary {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    results: FxHashMap<Arc<str>, TaskResult>,
}

impl RunSummary {
    pub fn result(&self, task_id: &str) -> Option<&TaskResult> {
        self.results.get(task_id)
    }

    pub fn is_success(&self, task_id: &str) -> bool {
        self.results.get(task_id).is_some_and(TaskResult::is_success)
    }

    /// Canonical string of a task's value output
    pub fn value(&self, task_id: &str, port: &str) -> Option<&str> {
        self.results.get(task_id).and_then(|r| r.value(port))
    }

    /// Path of a task's artifact output
    pub fn artifact(&self, task_id: &str, port: &str) -> Option<&Utf8Path> {
        self.results.get(task_id).and_then(|r| r.artifact(port))
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

/// Executes a compiled pipeline
pub struct Runner {
    pipeline: Arc<Pipeline>,
    plan: ExecutionPlan,
    datastore: DataStore,
    store: Arc<dyn ArtifactStore>,
    codecs: CodecRegistry,
    event_log: EventLog,
    cancel: CancellationToken,
}

impl Runner {
    /// Compile the pipeline and prepare a runner.
    ///
    /// Compilation failures (cycles, type mismatches, bad references)
    /// surface here - no partial plan is ever executed.
    pub fn new(
        pipeline: Pipeline,
        store: Arc<dyn ArtifactStore>,
        codecs: CodecRegistry,
    ) -> Result<Self> {
        let plan = compile(&pipeline)?;
        Ok(Self {
            pipeline: Arc::new(pipeline),
            plan,
            datastore: DataStore::new(),
            store,
            codecs,
            event_log: EventLog::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Get the event log for inspection/export
    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    /// Settled results so far (shared with running tasks)
    pub fn datastore(&self) -> &DataStore {
        &self.datastore
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    /// Token to abort the run from outside
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Mark transitively doomed tasks as skipped; returns true on progress
    fn propagate_skips(&self) -> bool {
        let mut progressed = false;
        let mut changed = true;

        while changed {
            changed = false;
            for task in self.pipeline.tasks() {
                if self.datastore.contains(&task.id) {
                    continue;
                }
                let bad_dep = self
                    .plan
                    .graph()
                    .get_dependencies(&task.id)
                    .iter()
                    .find(|dep| {
                        self.datastore.contains(dep) && !self.datastore.is_success(dep)
                    })
                    .cloned();

                if let Some(cause) = bad_dep {
                    self.datastore
                        .insert(Arc::clone(&task.id), TaskResult::skipped(Arc::clone(&cause)));
                    self.event_log.emit(EventKind::TaskSkipped {
                        task_id: Arc::clone(&task.id),
                        cause,
                    });
                    changed = true;
                    progressed = true;
                }
            }
        }

        progressed
    }

    /// Unsettled tasks whose producers all succeeded, in plan order
    fn ready_tasks(&self) -> Vec<Arc<Task>> {
        self.plan
            .order()
            .iter()
            .filter(|id| !self.datastore.contains(id))
            .filter(|id| {
                self.plan
                    .graph()
                    .get_dependencies(id)
                    .iter()
                    .all(|dep| self.datastore.is_success(dep))
            })
            .filter_map(|id| self.pipeline.task(id).cloned())
            .collect()
    }

    /// Main execution loop
    #[instrument(skip(self), fields(pipeline = %self.pipeline.name(), tasks = self.pipeline.tasks().len()))]
    pub async fn run(&self) -> Result<RunSummary> {
        let run_start = Instant::now();
        let total = self.pipeline.tasks().len();
        info!("starting pipeline run");

        self.event_log.emit(EventKind::PipelineStarted {
            task_count: total,
            run_id: format!("run-{}", Uuid::new_v4()),
            fingerprint: self.pipeline.fingerprint(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        });

        loop {
            if self.cancel.is_cancelled() {
                let pending = total - self.datastore.len();
                self.event_log.emit(EventKind::PipelineCancelled { pending });
                info!(pending, "pipeline run cancelled");
                return Err(ConveyorError::Cancelled { pending });
            }

            let progressed = self.propagate_skips();
            let ready = self.ready_tasks();

            if ready.is_empty() {
                if self.datastore.len() == total {
                    break;
                }
                if progressed {
                    continue;
                }
                self.event_log.emit(EventKind::PipelineFailed {
                    error: "deadlock: no tasks ready but pipeline not complete".to_string(),
                    failed_task: None,
                });
                return Err(ConveyorError::Deadlock);
            }

            // Schedule the whole wave up front, then dispatch; tokio handles
            // the concurrency
            for task in &ready {
                self.event_log.emit(EventKind::TaskScheduled {
                    task_id: Arc::clone(&task.id),
                    dependencies: self.plan.graph().get_dependencies(&task.id).to_vec(),
                });
            }

            let mut join_set: JoinSet<(Arc<str>, TaskResult)> = JoinSet::new();
            for task in ready {
                debug!(task = %task.id, "dispatching");

                let datastore = self.datastore.clone();
                let store = Arc::clone(&self.store);
                let codecs = self.codecs.clone();
                let event_log = self.event_log.clone();
                let cancel = self.cancel.child_token();

                join_set.spawn(async move {
                    let result =
                        execute_task(&task, datastore, store, codecs, event_log, cancel).await;
                    (Arc::clone(&task.id), result)
                });
            }

            // Results must be visible before dependents become ready
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((task_id, result)) => {
                        self.datastore.insert(task_id, result);
                    }
                    Err(e) => {
                        self.event_log.emit(EventKind::PipelineFailed {
                            error: format!("task panicked: {}", e),
                            failed_task: None,
                        });
                        return Err(ConveyorError::TaskPanicked {
                            task_id: "unknown".to_string(),
                            details: e.to_string(),
                        });
                    }
                }
            }
        }

        let results = self.datastore.snapshot();
        let completed = results.values().filter(|r| r.is_success()).count();
        let skipped = results.values().filter(|r| r.is_skipped()).count();
        let failed = results.len() - completed - skipped;

        self.event_log.emit(EventKind::PipelineCompleted {
            completed,
            failed,
            skipped,
            total_duration_ms: run_start.elapsed().as_millis() as u64,
        });
        info!(completed, failed, skipped, "pipeline run finished");

        Ok(RunSummary {
            completed,
            failed,
            skipped,
            results,
        })
    }
}

/// Execute one task: bind, invoke, capture. Never panics the run - every
/// failure settles as a failed result so the loop can skip downstream work.
async fn execute_task(
    task: &Arc<Task>,
    datastore: DataStore,
    store: Arc<dyn ArtifactStore>,
    codecs: CodecRegistry,
    event_log: EventLog,
    cancel: CancellationToken,
) -> TaskResult {
    let start = Instant::now();

    let invocation = match bind_arguments(
        task,
        &datastore,
        store.as_ref(),
        &codecs,
        cancel.clone(),
    ) {
        Ok(invocation) => invocation,
        Err(e) => {
            let duration = start.elapsed();
            event_log.emit(EventKind::TaskFailed {
                task_id: Arc::clone(&task.id),
                error: e.to_string(),
                duration_ms: duration.as_millis() as u64,
            });
            return TaskResult::failed(e.to_string(), duration);
        }
    };

    event_log.emit(EventKind::TaskStarted {
        task_id: Arc::clone(&task.id),
        inputs: inputs_json(&invocation),
    });

    // Keep the allocated output paths; the invocation moves into the unit
    let output_paths = invocation.output_paths.clone();

    let outcome = tokio::select! {
        _ = cancel.cancelled() => Err(ConveyorError::TaskFailed {
            task_id: task.id.to_string(),
            reason: "cancelled before completion".to_string(),
        }),
        result = task.component.invoker().invoke(invocation) => result,
    };

    let captured = outcome
        .and_then(|captured| capture_outputs(task, captured, output_paths, &codecs, start.elapsed()));

    match captured {
        Ok(result) => {
            event_log.emit(EventKind::TaskCompleted {
                task_id: Arc::clone(&task.id),
                duration_ms: result.duration.as_millis() as u64,
            });
            result
        }
        Err(e) => {
            let duration = start.elapsed();
            event_log.emit(EventKind::TaskFailed {
                task_id: Arc::clone(&task.id),
                error: e.to_string(),
                duration_ms: duration.as_millis() as u64,
            });
            TaskResult::failed(e.to_string(), duration)
        }
    }
}

/// Snapshot of what a unit receives, for the TaskStarted event
fn inputs_json(invocation: &Invocation) -> Value {
    let paths = |map: &FxHashMap<String, camino::Utf8PathBuf>| -> Value {
        Value::Object(
            map.iter()
                .map(|(k, p)| (k.clone(), Value::String(p.to_string())))
                .collect(),
        )
    };

    json!({
        "args": invocation.args,
        "input_paths": paths(&invocation.input_paths),
        "output_paths": paths(&invocation.output_paths),
    })
}
