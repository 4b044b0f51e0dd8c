//! Task Types - one bound invocation of a component
//!
//! Arguments are an explicit map from input-port name to `ArgumentRef`,
//! validated against the descriptor's declared ports at bind time. Output
//! references are explicit `{task, output}` pairs checked against declared
//! output ports - never inferred from runtime shape.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::component::ComponentDescriptor;

/// Reference to a declared output port of another task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRef {
    pub task: Arc<str>,
    /// Raw (canonical) output port name
    pub output: String,
}

/// What an input port is bound to: a literal value, or an upstream output
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentRef {
    /// Typed literal; serialized to its canonical string form by the binder
    Literal(Value),
    /// Output of a prior task, staged by the binder at execution time
    Output(OutputRef),
}

impl ArgumentRef {
    pub fn literal(value: impl Into<Value>) -> Self {
        ArgumentRef::Literal(value.into())
    }

    pub fn output_ref(&self) -> Option<&OutputRef> {
        match self {
            ArgumentRef::Output(r) => Some(r),
            ArgumentRef::Literal(_) => None,
        }
    }
}

impl From<OutputRef> for ArgumentRef {
    fn from(r: OutputRef) -> Self {
        ArgumentRef::Output(r)
    }
}

/// One bound invocation of a component within a pipeline
#[derive(Debug, Clone)]
pub struct Task {
    /// Interned task id, unique within the pipeline
    pub id: Arc<str>,
    /// Authoring order; the tie-breaker that keeps compilation deterministic
    pub index: usize,
    pub component: Arc<ComponentDescriptor>,
    /// Input-port name (raw) → argument
    pub arguments: FxHashMap<String, ArgumentRef>,
}

impl Task {
    /// Upstream output references in this task's arguments
    pub fn output_refs(&self) -> impl Iterator<Item = (&str, &OutputRef)> {
        self.arguments
            .iter()
            .filter_map(|(port, arg)| arg.output_ref().map(|r| (port.as_str(), r)))
    }
}
