//! Dependency Resolver - reference validation, type checking, topological order
//!
//! `compile` turns a frozen pipeline into an `ExecutionPlan` or fails; no
//! partial plans are ever produced. Checks run in fail-fast order:
//!
//! 1. Every output reference names an existing task (CNV-021) and one of its
//!    declared output ports (CNV-022)
//! 2. The graph is acyclic (CNV-020, three-color DFS)
//! 3. Every edge's type tags agree exactly (CNV-023, no implicit widening)
//!
//! The resulting order is deterministic: Kahn's algorithm with ties broken
//! by authoring index, so identical authoring code compiles to identical
//! orders across runs.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{ConveyorError, Result};
use crate::pipeline::Pipeline;

use super::graph::TaskGraph;

/// Compiled execution plan: the graph plus a deterministic topological order
#[derive(Debug)]
pub struct ExecutionPlan {
    order: Vec<Arc<str>>,
    graph: TaskGraph,
}

impl ExecutionPlan {
    /// Tasks in dependency order (every task strictly after its producers)
    pub fn order(&self) -> &[Arc<str>] {
        &self.order
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }
}

/// Compile a pipeline into an execution plan
pub fn compile(pipeline: &Pipeline) -> Result<ExecutionPlan> {
    validate_refs(pipeline)?;

    let graph = TaskGraph::from_pipeline(pipeline);
    graph.detect_cycles()?;
    check_types(pipeline, &graph)?;

    let order = topo_order(pipeline, &graph);
    debug!(tasks = order.len(), "pipeline compiled");

    Ok(ExecutionPlan { order, graph })
}

/// Every output reference must name an existing task and a declared output port
fn validate_refs(pipeline: &Pipeline) -> Result<()> {
    for task in pipeline.tasks() {
        for (_input, r) in task.output_refs() {
            let producer = pipeline.task(&r.task).ok_or_else(|| ConveyorError::UnknownTask {
                task_id: task.id.to_string(),
                producer: r.task.to_string(),
            })?;

            if producer.component.output(&r.output).is_none() {
                return Err(ConveyorError::UnknownOutput {
                    task_id: task.id.to_string(),
                    producer: r.task.to_string(),
                    output: r.output.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Per-edge type check: producer output tag must equal consumer input tag.
///
/// Opaque tags compare by string equality; built-ins must match exactly.
/// Kind (value vs artifact) is *not* checked - the binder adapts kinds.
fn check_types(pipeline: &Pipeline, graph: &TaskGraph) -> Result<()> {
    for edge in graph.edges() {
        // Producer side was established by validate_refs
        let producer = pipeline
            .task(&edge.producer)
            .and_then(|t| t.component.output(&edge.output))
            .expect("edge producer validated before type check");

        // Consumer side may come from a document that never saw the builder
        let consumer_task = pipeline
            .task(&edge.consumer)
            .expect("edge consumer is a pipeline task");
        let consumer = consumer_task.component.input(&edge.input).ok_or_else(|| {
            ConveyorError::UnknownPort {
                task_id: edge.consumer.to_string(),
                component: consumer_task.component.name().to_string(),
                port: edge.input.clone(),
            }
        })?;

        if producer.data_type != consumer.data_type {
            return Err(ConveyorError::TypeMismatch {
                producer: edge.producer.to_string(),
                output: edge.output.clone(),
                output_type: producer.data_type.tag().to_string(),
                consumer: edge.consumer.to_string(),
                input: edge.input.clone(),
                input_type: consumer.data_type.tag().to_string(),
            });
        }
    }

    Ok(())
}

/// Kahn's algorithm with authoring-order tie-break.
///
/// When several tasks have no unresolved predecessors, the one authored
/// first is emitted first - compilation output is reproducible.
fn topo_order(pipeline: &Pipeline, graph: &TaskGraph) -> Vec<Arc<str>> {
    let index_of: FxHashMap<&str, usize> = pipeline
        .tasks()
        .iter()
        .map(|t| (t.id.as_ref(), t.index))
        .collect();

    let mut indegree: FxHashMap<&str, usize> = FxHashMap::default();
    for task in pipeline.tasks() {
        indegree.insert(task.id.as_ref(), graph.get_dependencies(&task.id).len());
    }

    // Min-heap on authoring index keeps ties stable
    let mut ready: BinaryHeap<Reverse<(usize, Arc<str>)>> = BinaryHeap::new();
    for task in pipeline.tasks() {
        if indegree[task.id.as_ref()] == 0 {
            ready.push(Reverse((task.index, Arc::clone(&task.id))));
        }
    }

    let mut order: Vec<Arc<str>> = Vec::with_capacity(pipeline.tasks().len());
    while let Some(Reverse((_, id))) = ready.pop() {
        for successor in graph.get_successors(&id) {
            let remaining = indegree
                .get_mut(successor.as_ref())
                .expect("successor missing from indegree map");
            *remaining -= 1;
            if *remaining == 0 {
                ready.push(Reverse((index_of[successor.as_ref()], Arc::clone(successor))));
            }
        }
        order.push(id);
    }

    // detect_cycles ran first, so every task was emitted
    debug_assert_eq!(order.len(), pipeline.tasks().len());
    order
}
