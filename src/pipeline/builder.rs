//! Pipeline Builder - single-pass graph authoring
//!
//! The builder accumulates tasks as a pipeline-authoring routine executes
//! and records the data dependencies implied by output references. Authoring
//! is synchronous and single-threaded; `finish()` consumes the builder, so a
//! frozen `Pipeline` can never grow another task.
//!
//! Bind-time failures (fail-fast, offending task/port named):
//! - CNV-030 UnknownPort: argument name matches no declared input
//! - CNV-031 MissingRequiredInput: required input left unbound
//! - CNV-032/033: duplicate or non-snake_case task id
//! - CNV-034 DuplicateArgument: same port bound under raw and display name
//!
//! Type-tag mismatches are deliberately *not* checked here - they surface at
//! compilation, once the whole graph exists.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::component::ComponentDescriptor;
use crate::error::{ConveyorError, Result};
use crate::util::{intern, snake_case_violation};

use super::task::{ArgumentRef, OutputRef, Task};
use super::Pipeline;

/// Handle to an added task; the only way to mint `OutputRef`s
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: Arc<str>,
    component: Arc<ComponentDescriptor>,
}

impl TaskHandle {
    pub fn id(&self) -> &Arc<str> {
        &self.id
    }

    /// Reference one of this task's declared outputs (raw or display name).
    /// Fails with `UnknownPort` for anything not declared.
    pub fn output(&self, name: &str) -> Result<OutputRef> {
        let port = self.component.output(name).ok_or_else(|| {
            ConveyorError::UnknownPort {
                task_id: self.id.to_string(),
                component: self.component.name().to_string(),
                port: name.to_string(),
            }
        })?;

        Ok(OutputRef {
            task: Arc::clone(&self.id),
            output: port.name.clone(),
        })
    }
}

/// Accumulates tasks during one authoring pass
pub struct PipelineBuilder {
    name: String,
    tasks: Vec<Arc<Task>>,
    ids: FxHashSet<Arc<str>>,
}

impl PipelineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
            ids: FxHashSet::default(),
        }
    }

    /// Bind a component to concrete arguments, producing a task.
    ///
    /// `arguments` maps author-facing input names (raw or display) to
    /// literals or upstream output references. Keys are normalized to raw
    /// port names before storage.
    pub fn add_task(
        &mut self,
        id: &str,
        component: &Arc<ComponentDescriptor>,
        arguments: Vec<(&str, ArgumentRef)>,
    ) -> Result<TaskHandle> {
        if let Some(reason) = snake_case_violation(id) {
            return Err(ConveyorError::InvalidTaskId {
                task_id: id.to_string(),
                reason: reason.to_string(),
            });
        }

        let id = intern(id);
        if !self.ids.insert(Arc::clone(&id)) {
            return Err(ConveyorError::DuplicateTask {
                task_id: id.to_string(),
            });
        }

        // Normalize argument keys to raw port names
        let mut bound: FxHashMap<String, ArgumentRef> = FxHashMap::default();
        for (key, arg) in arguments {
            let port = component.input(key).ok_or_else(|| ConveyorError::UnknownPort {
                task_id: id.to_string(),
                component: component.name().to_string(),
                port: key.to_string(),
            })?;

            if bound.insert(port.name.clone(), arg).is_some() {
                return Err(ConveyorError::DuplicateArgument {
                    task_id: id.to_string(),
                    port: port.name.clone(),
                });
            }
        }

        // Every required input must be bound; defaults and optional ports may rest
        for port in component.inputs() {
            if port.required() && !bound.contains_key(&port.name) {
                return Err(ConveyorError::MissingRequiredInput {
                    task_id: id.to_string(),
                    port: port.name.clone(),
                });
            }
        }

        let task = Arc::new(Task {
            id: Arc::clone(&id),
            index: self.tasks.len(),
            component: Arc::clone(component),
            arguments: bound,
        });
        self.tasks.push(task);

        Ok(TaskHandle {
            id,
            component: Arc::clone(component),
        })
    }

    /// Number of tasks authored so far
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Freeze the pipeline. Consumes the builder: no mutation afterwards.
    pub fn finish(self) -> Pipeline {
        Pipeline::new(self.name, self.tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecRegistry;
    use crate::component::{Captured, DataType, FnInvoke, Port};

    fn sum_component(codecs: &CodecRegistry) -> Arc<ComponentDescriptor> {
        ComponentDescriptor::new(
            "sum_numbers",
            vec![Port::artifact("numbers_path", DataType::List)],
            vec![Port::value("total", DataType::Integer)],
            FnInvoke::new(|_| Ok(Captured::single(0))),
            codecs,
        )
        .unwrap()
    }

    fn gen_component(codecs: &CodecRegistry) -> Arc<ComponentDescriptor> {
        ComponentDescriptor::new(
            "write_numbers",
            vec![
                Port::value("start", DataType::Integer).with_default("0"),
                Port::value("count", DataType::Integer),
            ],
            vec![Port::artifact("numbers_path", DataType::List)],
            FnInvoke::new(|_| Ok(Captured::none())),
            codecs,
        )
        .unwrap()
    }

    // ═══════════════════════════════════════════════════════════════
    // BIND-TIME VALIDATION TESTS
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn add_task_with_display_names() {
        let codecs = CodecRegistry::with_builtins();
        let gen = gen_component(&codecs);
        let sum = sum_component(&codecs);

        let mut builder = PipelineBuilder::new("numbers");
        let write = builder
            .add_task("write", &gen, vec![("count", ArgumentRef::literal(5))])
            .unwrap();
        // "numbers" is the display name of "numbers_path"
        builder
            .add_task(
                "sum",
                &sum,
                vec![("numbers", write.output("numbers").unwrap().into())],
            )
            .unwrap();

        let pipeline = builder.finish();
        assert_eq!(pipeline.tasks().len(), 2);
        // Keys are normalized to the raw port name
        assert!(pipeline.task("sum").unwrap().arguments.contains_key("numbers_path"));
    }

    #[test]
    fn unknown_argument_name_fails() {
        let codecs = CodecRegistry::with_builtins();
        let gen = gen_component(&codecs);

        let mut builder = PipelineBuilder::new("p");
        let err = builder
            .add_task("write", &gen, vec![("amount", ArgumentRef::literal(5))])
            .unwrap_err();

        assert!(err.to_string().contains("CNV-030"));
        assert!(err.to_string().contains("amount"));
    }

    #[test]
    fn missing_required_input_fails() {
        let codecs = CodecRegistry::with_builtins();
        let gen = gen_component(&codecs);

        // "count" has no default and is not optional
        let mut builder = PipelineBuilder::new("p");
        let err = builder.add_task("write", &gen, vec![]).unwrap_err();

        assert!(err.to_string().contains("CNV-031"));
        assert!(err.to_string().contains("count"));
    }

    #[test]
    fn defaulted_input_may_stay_unbound() {
        let codecs = CodecRegistry::with_builtins();
        let gen = gen_component(&codecs);

        let mut builder = PipelineBuilder::new("p");
        // "start" has a default, only "count" is required
        assert!(builder
            .add_task("write", &gen, vec![("count", ArgumentRef::literal(5))])
            .is_ok());
    }

    #[test]
    fn duplicate_task_id_fails() {
        let codecs = CodecRegistry::with_builtins();
        let gen = gen_component(&codecs);

        let mut builder = PipelineBuilder::new("p");
        builder
            .add_task("write", &gen, vec![("count", ArgumentRef::literal(1))])
            .unwrap();
        let err = builder
            .add_task("write", &gen, vec![("count", ArgumentRef::literal(2))])
            .unwrap_err();

        assert!(err.to_string().contains("CNV-032"));
    }

    #[test]
    fn non_snake_case_task_id_fails() {
        let codecs = CodecRegistry::with_builtins();
        let gen = gen_component(&codecs);

        let mut builder = PipelineBuilder::new("p");
        let err = builder
            .add_task("Write-Numbers", &gen, vec![("count", ArgumentRef::literal(1))])
            .unwrap_err();

        assert!(err.to_string().contains("CNV-033"));
    }

    #[test]
    fn binding_same_port_twice_fails() {
        let codecs = CodecRegistry::with_builtins();
        let sum = sum_component(&codecs);
        let gen = gen_component(&codecs);

        let mut builder = PipelineBuilder::new("p");
        let write = builder
            .add_task("write", &gen, vec![("count", ArgumentRef::literal(1))])
            .unwrap();
        let err = builder
            .add_task(
                "sum",
                &sum,
                vec![
                    ("numbers", write.output("numbers").unwrap().into()),
                    ("numbers_path", write.output("numbers").unwrap().into()),
                ],
            )
            .unwrap_err();

        assert!(err.to_string().contains("CNV-034"));
    }

    #[test]
    fn handle_output_checks_declared_ports() {
        let codecs = CodecRegistry::with_builtins();
        let gen = gen_component(&codecs);

        let mut builder = PipelineBuilder::new("p");
        let write = builder
            .add_task("write", &gen, vec![("count", ArgumentRef::literal(1))])
            .unwrap();

        assert!(write.output("numbers").is_ok());
        assert!(write.output("numbers_path").is_ok());
        let err = write.output("wrong").unwrap_err();
        assert!(err.to_string().contains("CNV-030"));
    }

    // ═══════════════════════════════════════════════════════════════
    // KIND ADAPTATION AT BIND TIME
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn literal_against_artifact_input_binds() {
        // Kind adaptation is allowed at bind time; the runtime spills the
        // literal to a file before the unit runs.
        let codecs = CodecRegistry::with_builtins();
        let sum = sum_component(&codecs);

        let mut builder = PipelineBuilder::new("p");
        assert!(builder
            .add_task(
                "sum",
                &sum,
                vec![("numbers", ArgumentRef::literal(serde_json::json!([1, 2, 3])))],
            )
            .is_ok());
    }
}
