//! TaskGraph - DAG structure built from output references (optimized)
//!
//! Performance notes:
//! - Arc<str> for zero-cost cloning of task ids
//! - FxHashMap for faster hashing (non-crypto)
//! - SmallVec for stack-allocated small dependency lists (0-4 items)
//!
//! DAG validation:
//! - Cycle detection using DFS three-color algorithm

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::error::{ConveyorError, Result};
use crate::pipeline::Pipeline;

/// Stack-allocated deps: most tasks have 0-4 dependencies
pub type DepVec = SmallVec<[Arc<str>; 4]>;

/// One data edge: producer output port → consumer input port
#[derive(Debug, Clone)]
pub struct Edge {
    pub producer: Arc<str>,
    pub output: String,
    pub consumer: Arc<str>,
    pub input: String,
}

/// Graph of task dependencies built from output references
#[derive(Debug)]
pub struct TaskGraph {
    /// task_id → successor task_ids
    adjacency: FxHashMap<Arc<str>, DepVec>,
    /// task_id → predecessor task_ids
    predecessors: FxHashMap<Arc<str>, DepVec>,
    /// All task ids in authoring order
    task_ids: Vec<Arc<str>>,
    /// Port-level edges, kept for type checking and staging
    edges: Vec<Edge>,
}

impl TaskGraph {
    /// Build the graph from a pipeline's output references.
    ///
    /// Assumes references were validated against the task set beforehand
    /// (`resolve::compile` does); unknown producers would simply produce
    /// dangling adjacency entries here.
    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        let capacity = pipeline.tasks().len();
        let mut adjacency: FxHashMap<Arc<str>, DepVec> =
            FxHashMap::with_capacity_and_hasher(capacity, Default::default());
        let mut predecessors: FxHashMap<Arc<str>, DepVec> =
            FxHashMap::with_capacity_and_hasher(capacity, Default::default());
        let mut task_ids: Vec<Arc<str>> = Vec::with_capacity(capacity);
        let mut edges: Vec<Edge> = Vec::new();

        for task in pipeline.tasks() {
            task_ids.push(Arc::clone(&task.id));
            adjacency.entry(Arc::clone(&task.id)).or_default();
            predecessors.entry(Arc::clone(&task.id)).or_default();
        }

        for task in pipeline.tasks() {
            for (input, r) in task.output_refs() {
                edges.push(Edge {
                    producer: Arc::clone(&r.task),
                    output: r.output.clone(),
                    consumer: Arc::clone(&task.id),
                    input: input.to_string(),
                });

                adjacency
                    .entry(Arc::clone(&r.task))
                    .or_default()
                    .push(Arc::clone(&task.id));
                predecessors
                    .entry(Arc::clone(&task.id))
                    .or_default()
                    .push(Arc::clone(&r.task));
            }
        }

        Self {
            adjacency,
            predecessors,
            task_ids,
            edges,
        }
    }

    /// Get dependencies of a task (may contain duplicates when a consumer
    /// reads several outputs of the same producer)
    #[inline]
    pub fn get_dependencies(&self, task_id: &str) -> &[Arc<str>] {
        static EMPTY: &[Arc<str>] = &[];
        self.predecessors
            .get(task_id)
            .map_or(EMPTY, SmallVec::as_slice)
    }

    /// Get successors of a task
    #[inline]
    pub fn get_successors(&self, task_id: &str) -> &[Arc<str>] {
        static EMPTY: &[Arc<str>] = &[];
        self.adjacency
            .get(task_id)
            .map_or(EMPTY, SmallVec::as_slice)
    }

    /// All task ids in authoring order
    pub fn task_ids(&self) -> &[Arc<str>] {
        &self.task_ids
    }

    /// Port-level edges
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Find tasks with no successors (final tasks)
    pub fn final_tasks(&self) -> Vec<Arc<str>> {
        self.task_ids
            .iter()
            .filter(|id| {
                self.adjacency
                    .get(id.as_ref())
                    .is_none_or(SmallVec::is_empty)
            })
            .cloned() // Arc::clone is O(1)
            .collect()
    }

    /// Check if there's a path from `from` to `to` (BFS)
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }

        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut queue: VecDeque<&str> = VecDeque::new();

        queue.push_back(from);
        visited.insert(from);

        while let Some(current) = queue.pop_front() {
            if let Some(neighbors) = self.adjacency.get(current) {
                for neighbor in neighbors {
                    if neighbor.as_ref() == to {
                        return true;
                    }
                    if !visited.contains(neighbor.as_ref()) {
                        visited.insert(neighbor.as_ref());
                        queue.push_back(neighbor.as_ref());
                    }
                }
            }
        }

        false
    }

    /// Detect cycles using DFS with three-color marking.
    ///
    /// Returns `Ok(())` if acyclic, `Err(CycleDetected)` with the
    /// participating task ids otherwise.
    ///
    /// Standard three-color algorithm:
    /// - White: unvisited
    /// - Gray: currently in DFS stack (visiting)
    /// - Black: fully processed (all descendants visited)
    ///
    /// A cycle is detected when a Gray node is reached while traversing.
    pub fn detect_cycles(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut colors: FxHashMap<Arc<str>, Color> = self
            .task_ids
            .iter()
            .map(|id| (Arc::clone(id), Color::White))
            .collect();
        let mut stack: Vec<Arc<str>> = Vec::new();

        fn dfs(
            node: Arc<str>,
            adjacency: &FxHashMap<Arc<str>, DepVec>,
            colors: &mut FxHashMap<Arc<str>, Color>,
            stack: &mut Vec<Arc<str>>,
        ) -> std::result::Result<(), String> {
            colors.insert(Arc::clone(&node), Color::Gray);
            stack.push(Arc::clone(&node));

            if let Some(neighbors) = adjacency.get(&node) {
                for neighbor in neighbors {
                    match colors.get(neighbor) {
                        Some(Color::Gray) => {
                            // Found cycle - build path from stack
                            let cycle_start = stack
                                .iter()
                                .position(|x| x.as_ref() == neighbor.as_ref())
                                .unwrap_or(0);
                            let cycle: Vec<&str> =
                                stack[cycle_start..].iter().map(|s| s.as_ref()).collect();
                            return Err(format!("{} -> {}", cycle.join(" -> "), neighbor));
                        }
                        Some(Color::White) | None => {
                            dfs(Arc::clone(neighbor), adjacency, colors, stack)?;
                        }
                        Some(Color::Black) => {} // Already processed
                    }
                }
            }

            stack.pop();
            colors.insert(node, Color::Black);
            Ok(())
        }

        for task_id in &self.task_ids {
            if colors.get(task_id) == Some(&Color::White) {
                if let Err(cycle) = dfs(
                    Arc::clone(task_id),
                    &self.adjacency,
                    &mut colors,
                    &mut stack,
                ) {
                    return Err(ConveyorError::CycleDetected { cycle });
                }
            }
        }

        Ok(())
    }
}
