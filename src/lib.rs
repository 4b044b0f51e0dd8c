//! Conveyor - pipeline graph compiler and artifact-passing runtime
//!
//! Independently-defined components with typed inputs/outputs are bound into
//! tasks, compiled into an executable DAG, and run with data staged between
//! producers and consumers - small values as canonical strings, large data
//! as file-backed artifacts.
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DOMAIN MODEL                          │
//! │  component/  Port, DataType, ComponentDescriptor, Invoke     │
//! │  pipeline/   PipelineBuilder, Task, ArgumentRef, Manifest    │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      APPLICATION LAYER                       │
//! │  dag/        TaskGraph, compile (cycles, types, topo order)  │
//! │  binding/    bind_arguments / capture_outputs                │
//! │  runtime/    Runner (tokio ready-loop, cancellation)         │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    INFRASTRUCTURE LAYER                      │
//! │  store/      ArtifactStore, DataStore                        │
//! │  codec/      canonical value codecs                          │
//! │  event/      EventLog (run audit trail)                      │
//! │  util/       interner, tracing init                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`component`] | Typed unit declarations, registration-time validation |
//! | [`pipeline`] | Single-pass authoring, frozen pipelines, manifests |
//! | [`dag`] | Dependency graph, cycle detection, deterministic order |
//! | [`binding`] | Execution-time value/artifact staging |
//! | [`runtime`] | Parallel execution with skip-downstream failure semantics |
//! | [`store`] | Artifact storage collaborator, settled task results |
//! | [`codec`] | One canonical string form per built-in value type |
//! | [`event`] | Append-only run audit trail |
//! | [`error`] | Error types with codes and fix suggestions |

// ═══════════════════════════════════════════════════════════════
// DOMAIN MODEL
// ═══════════════════════════════════════════════════════════════
pub mod component;
pub mod pipeline;

// ═══════════════════════════════════════════════════════════════
// APPLICATION LAYER
// ═══════════════════════════════════════════════════════════════
pub mod binding;
pub mod dag;
pub mod runtime;

// ═══════════════════════════════════════════════════════════════
// INFRASTRUCTURE LAYER
// ═══════════════════════════════════════════════════════════════
pub mod codec;
pub mod event;
pub mod store;
pub mod util;

// ═══════════════════════════════════════════════════════════════
// CROSS-CUTTING
// ═══════════════════════════════════════════════════════════════
pub mod config;
pub mod error;

// ═══════════════════════════════════════════════════════════════
// PUBLIC API RE-EXPORTS
// ═══════════════════════════════════════════════════════════════

// Error types
pub use error::{ConveyorError, FixSuggestion, Result};

// Config
pub use config::RuntimeConfig;

// Domain model
pub use component::{
    Captured, ComponentDescriptor, ComponentRegistry, DataType, FnInvoke, Invocation, Invoke,
    Port, PortKind,
};
pub use pipeline::{
    ArgumentRef, OutputRef, Pipeline, PipelineBuilder, PipelineManifest, Task, TaskHandle,
};

// Application layer
pub use dag::{compile, ExecutionPlan, TaskGraph};
pub use runtime::{RunSummary, Runner};

// Infrastructure
pub use codec::{CodecRegistry, ValueCodec};
pub use event::{Event, EventKind, EventLog};
pub use store::{ArtifactStore, DataStore, LocalArtifactStore, TaskResult, TaskStatus};
