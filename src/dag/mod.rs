//! DAG Module - dependency graph and compilation
//!
//! - `graph`: `TaskGraph` structure (adjacency, reachability, cycle detection)
//! - `resolve`: `compile()` - validation, type checking, deterministic order

mod graph;
mod resolve;

pub use graph::{DepVec, Edge, TaskGraph};
pub use resolve::{compile, ExecutionPlan};
