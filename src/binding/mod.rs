//! Binding Module - execution-time data staging between tasks
//!
//! Data flow per task:
//! ```text
//! arguments (Literal | Output) ──► bind_arguments ──► Invocation
//!                                                        │ unit runs
//!                                                        ▼
//! Captured values + output paths ──► capture_outputs ──► TaskResult
//! ```
//!
//! Compilation has already guaranteed type-tag agreement on every edge;
//! this layer only moves bytes: canonical strings for values, paths for
//! artifacts, adapting kinds where producer and consumer disagree.

mod resolve;

pub use resolve::{bind_arguments, capture_outputs};
