//! Conveyor Error Types with Error Codes
//!
//! Error code ranges:
//! - CNV-000-009: Pipeline/manifest errors
//! - CNV-010-019: Component registration errors
//! - CNV-020-029: Graph compilation errors
//! - CNV-030-039: Task binding errors
//! - CNV-040-049: Execution errors
//! - CNV-050-059: IO/store errors

use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConveyorError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// All error variants are part of the public API.
///
/// Implements both `thiserror::Error` for std error compatibility
/// and `miette::Diagnostic` for fancy terminal error display.
#[derive(Error, Debug, Diagnostic)]
#[diagnostic(url(docsrs))]
pub enum ConveyorError {
    // ═══════════════════════════════════════════
    // PIPELINE/MANIFEST ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[CNV-001] Failed to parse pipeline manifest: {details}")]
    #[diagnostic(
        code(conveyor::parse_error),
        help("Check YAML syntax: indentation and quoting")
    )]
    ParseError { details: String },

    #[error("[CNV-002] Invalid schema version: expected '{expected}', got '{actual}'")]
    #[diagnostic(
        code(conveyor::invalid_schema_version),
        help("Use 'conveyor/pipeline@0.1' as the schema version")
    )]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("[CNV-003] Task '{task_id}' references unregistered component '{component}'")]
    #[diagnostic(
        code(conveyor::unknown_component),
        help("Register the component before loading the manifest")
    )]
    UnknownComponent { component: String, task_id: String },

    #[error("[CNV-004] Manifest disagrees with registered component '{component}': {reason}")]
    #[diagnostic(
        code(conveyor::manifest_mismatch),
        help("The registered component's ports must match the manifest exactly")
    )]
    ManifestMismatch { component: String, reason: String },

    // ═══════════════════════════════════════════
    // COMPONENT REGISTRATION ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[CNV-010] Duplicate {direction} port '{port}' on component '{component}'")]
    #[diagnostic(
        code(conveyor::duplicate_port),
        help("Port names must be unique within a component's inputs and outputs")
    )]
    DuplicatePort {
        component: String,
        direction: &'static str,
        port: String,
    },

    #[error("[CNV-011] Invalid name '{name}': {reason}")]
    #[diagnostic(
        code(conveyor::invalid_name),
        help("Use snake_case: lowercase letter first, then [a-z0-9_]")
    )]
    InvalidName { name: String, reason: String },

    #[error(
        "[CNV-012] No codec registered for value type '{data_type}' \
         (port '{port}' on component '{component}')"
    )]
    #[diagnostic(
        code(conveyor::codec_missing),
        help("Register a custom codec for the opaque type, or declare the port as an artifact")
    )]
    CodecMissing {
        component: String,
        port: String,
        data_type: String,
    },

    #[error("[CNV-013] Component '{component}' is already registered")]
    #[diagnostic(
        code(conveyor::duplicate_component),
        help("Component names must be unique within a registry")
    )]
    DuplicateComponent { component: String },

    // ═══════════════════════════════════════════
    // GRAPH COMPILATION ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[CNV-020] Cycle detected in pipeline graph: {cycle}")]
    #[diagnostic(
        code(conveyor::cycle_detected),
        help("Remove the circular reference - a task cannot depend on its own outputs")
    )]
    CycleDetected { cycle: String },

    #[error("[CNV-021] Task '{task_id}' references unknown task '{producer}'")]
    #[diagnostic(
        code(conveyor::unknown_task),
        help("Verify the producing task exists in the pipeline")
    )]
    UnknownTask { task_id: String, producer: String },

    #[error("[CNV-022] Task '{task_id}' references undeclared output '{output}' of task '{producer}'")]
    #[diagnostic(
        code(conveyor::unknown_output),
        help("Check the producing component's declared output ports")
    )]
    UnknownOutput {
        task_id: String,
        producer: String,
        output: String,
    },

    #[error(
        "[CNV-023] Type mismatch: output '{producer}.{output}' is '{output_type}' \
         but input '{consumer}.{input}' expects '{input_type}'"
    )]
    #[diagnostic(
        code(conveyor::type_mismatch),
        help("Producer and consumer type tags must match exactly - there is no implicit widening")
    )]
    TypeMismatch {
        producer: String,
        output: String,
        output_type: String,
        consumer: String,
        input: String,
        input_type: String,
    },

    // ═══════════════════════════════════════════
    // TASK BINDING ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[CNV-030] Unknown port '{port}' on component '{component}' (task '{task_id}')")]
    #[diagnostic(
        code(conveyor::unknown_port),
        help("Argument names must match a declared input port (raw or display name)")
    )]
    UnknownPort {
        task_id: String,
        component: String,
        port: String,
    },

    #[error("[CNV-031] Missing required input '{port}' on task '{task_id}'")]
    #[diagnostic(
        code(conveyor::missing_required_input),
        help("Bind the input to a literal or an upstream output, or give the port a default")
    )]
    MissingRequiredInput { task_id: String, port: String },

    #[error("[CNV-032] Duplicate task id '{task_id}'")]
    #[diagnostic(
        code(conveyor::duplicate_task),
        help("Task ids must be unique within a pipeline")
    )]
    DuplicateTask { task_id: String },

    #[error("[CNV-033] Invalid task id '{task_id}': {reason}")]
    #[diagnostic(
        code(conveyor::invalid_task_id),
        help("Use snake_case: lowercase letter first, then [a-z0-9_]")
    )]
    InvalidTaskId { task_id: String, reason: String },

    #[error("[CNV-034] Input '{port}' bound twice on task '{task_id}'")]
    #[diagnostic(
        code(conveyor::duplicate_argument),
        help("A raw port name and its display name refer to the same port")
    )]
    DuplicateArgument { task_id: String, port: String },

    // ═══════════════════════════════════════════
    // EXECUTION ERRORS (040-049)
    // ═══════════════════════════════════════════
    #[error(
        "[CNV-040] Missing output artifact: task '{consumer}' reads '{producer}.{output}' \
         but nothing was written at '{path}'"
    )]
    #[diagnostic(
        code(conveyor::missing_output_artifact),
        help("The producing unit must write to the output path it was given")
    )]
    MissingOutputArtifact {
        producer: String,
        output: String,
        consumer: String,
        path: String,
    },

    #[error("[CNV-041] Serialization failed for type '{data_type}': {reason}")]
    #[diagnostic(
        code(conveyor::serialization),
        help("The value must match the canonical string form of its declared type")
    )]
    Serialization { data_type: String, reason: String },

    #[error(
        "[CNV-042] Task '{task_id}' returned {actual} value output(s), \
         component '{component}' declares {expected}"
    )]
    #[diagnostic(
        code(conveyor::output_arity),
        help("Units return one value per declared value output, in declaration order")
    )]
    OutputArity {
        task_id: String,
        component: String,
        expected: usize,
        actual: usize,
    },

    #[error("[CNV-043] Task '{task_id}' panicked: {details}")]
    #[diagnostic(code(conveyor::task_panicked))]
    TaskPanicked { task_id: String, details: String },

    #[error("[CNV-044] Deadlock: no tasks ready but pipeline not complete")]
    #[diagnostic(
        code(conveyor::deadlock),
        help("This indicates a bug in compilation - please report it")
    )]
    Deadlock,

    #[error("[CNV-045] Run cancelled: {pending} task(s) never dispatched")]
    #[diagnostic(code(conveyor::cancelled))]
    Cancelled { pending: usize },

    #[error("[CNV-046] Task '{task_id}' failed: {reason}")]
    #[diagnostic(code(conveyor::task_failed))]
    TaskFailed { task_id: String, reason: String },

    // ═══════════════════════════════════════════
    // IO/STORE ERRORS (050-059)
    // ═══════════════════════════════════════════
    #[error("[CNV-050] IO error: {0}")]
    #[diagnostic(code(conveyor::io), help("Check file path and permissions"))]
    Io(#[from] std::io::Error),

    #[error("[CNV-051] Artifact store error: {reason}")]
    #[diagnostic(code(conveyor::store))]
    Store { reason: String },
}

impl FixSuggestion for ConveyorError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            ConveyorError::ParseError { .. } => Some("Check YAML syntax: indentation and quoting"),
            ConveyorError::InvalidSchemaVersion { .. } => {
                Some("Use 'conveyor/pipeline@0.1' as the schema version")
            }
            ConveyorError::UnknownComponent { .. } => {
                Some("Register the component before loading the manifest")
            }
            ConveyorError::ManifestMismatch { .. } => {
                Some("The registered component's ports must match the manifest exactly")
            }
            ConveyorError::DuplicatePort { .. } => {
                Some("Port names must be unique within a component's inputs and outputs")
            }
            ConveyorError::InvalidName { .. } | ConveyorError::InvalidTaskId { .. } => {
                Some("Use snake_case: lowercase letter first, then [a-z0-9_]")
            }
            ConveyorError::CodecMissing { .. } => {
                Some("Register a custom codec for the opaque type, or declare the port as an artifact")
            }
            ConveyorError::DuplicateComponent { .. } => {
                Some("Component names must be unique within a registry")
            }
            ConveyorError::CycleDetected { .. } => {
                Some("Remove the circular reference - a task cannot depend on its own outputs")
            }
            ConveyorError::UnknownTask { .. } => {
                Some("Verify the producing task exists in the pipeline")
            }
            ConveyorError::UnknownOutput { .. } => {
                Some("Check the producing component's declared output ports")
            }
            ConveyorError::TypeMismatch { .. } => {
                Some("Producer and consumer type tags must match exactly")
            }
            ConveyorError::UnknownPort { .. } => {
                Some("Argument names must match a declared input port")
            }
            ConveyorError::MissingRequiredInput { .. } => {
                Some("Bind the input to a literal or an upstream output, or give the port a default")
            }
            ConveyorError::DuplicateTask { .. } => Some("Task ids must be unique within a pipeline"),
            ConveyorError::DuplicateArgument { .. } => {
                Some("A raw port name and its display name refer to the same port")
            }
            ConveyorError::MissingOutputArtifact { .. } => {
                Some("The producing unit must write to the output path it was given")
            }
            ConveyorError::Serialization { .. } => {
                Some("The value must match the canonical string form of its declared type")
            }
            ConveyorError::OutputArity { .. } => {
                Some("Units return one value per declared value output, in declaration order")
            }
            ConveyorError::Io(_) => Some("Check file path and permissions"),
            _ => None,
        }
    }
}
