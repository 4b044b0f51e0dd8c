//! Pipeline Manifest - portable compiled representation
//!
//! The finalized pipeline (tasks + dependency order + port metadata)
//! serializes to a static YAML/JSON document consumable by an external
//! execution engine. Round-trip is lossless for task ids, component
//! references, argument bindings, and type tags; invocation targets cannot
//! travel in a document, so loading re-links components by name against a
//! `ComponentRegistry`.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::component::{ComponentRegistry, Port};
use crate::dag::compile;
use crate::error::{ConveyorError, Result};
use crate::util::intern;

use super::task::{ArgumentRef, OutputRef, Task};
use super::Pipeline;

/// Expected schema version
pub const SCHEMA_V01: &str = "conveyor/pipeline@0.1";

/// Portable, static representation of a compiled pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineManifest {
    pub schema: String,
    pub name: String,
    /// Structural fingerprint at compile time
    pub fingerprint: String,
    /// Referenced components with their full port metadata
    pub components: Vec<ManifestComponent>,
    /// Tasks in authoring order
    pub tasks: Vec<ManifestTask>,
    /// Deterministic dependency order
    pub order: Vec<String>,
}

/// Descriptor reference: name plus the port table an external engine needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestComponent {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<Port>,
    #[serde(default)]
    pub outputs: Vec<Port>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestTask {
    pub id: String,
    pub component: String,
    /// Input-port name → binding (sorted for stable output)
    #[serde(default)]
    pub arguments: BTreeMap<String, ManifestArgument>,
}

/// One argument binding
///
/// `{from, output}` references an upstream task's output port;
/// `{literal}` is a typed JSON literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestArgument {
    Output { from: String, output: String },
    Literal { literal: Value },
}

impl PipelineManifest {
    /// Compile a pipeline and emit its portable representation.
    ///
    /// Fails exactly when compilation fails - a manifest is never produced
    /// for a pipeline that has no execution plan.
    pub fn from_pipeline(pipeline: &Pipeline) -> Result<Self> {
        let plan = compile(pipeline)?;

        let mut components: Vec<ManifestComponent> = Vec::new();
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for task in pipeline.tasks() {
            if seen.insert(task.component.name()) {
                components.push(ManifestComponent {
                    name: task.component.name().to_string(),
                    inputs: task.component.inputs().to_vec(),
                    outputs: task.component.outputs().to_vec(),
                });
            }
        }

        let tasks = pipeline
            .tasks()
            .iter()
            .map(|task| ManifestTask {
                id: task.id.to_string(),
                component: task.component.name().to_string(),
                arguments: task
                    .arguments
                    .iter()
                    .map(|(port, arg)| {
                        let binding = match arg {
                            ArgumentRef::Literal(value) => ManifestArgument::Literal {
                                literal: value.clone(),
                            },
                            ArgumentRef::Output(r) => ManifestArgument::Output {
                                from: r.task.to_string(),
                                output: r.output.clone(),
                            },
                        };
                        (port.clone(), binding)
                    })
                    .collect(),
            })
            .collect();

        Ok(Self {
            schema: SCHEMA_V01.to_string(),
            name: pipeline.name().to_string(),
            fingerprint: pipeline.fingerprint(),
            components,
            tasks,
            order: plan.order().iter().map(|id| id.to_string()).collect(),
        })
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ConveyorError::ParseError {
            details: e.to_string(),
        })
    }

    /// Parse from YAML, rejecting unknown schema versions
    pub fn from_yaml(source: &str) -> Result<Self> {
        let manifest: Self =
            serde_yaml::from_str(source).map_err(|e| ConveyorError::ParseError {
                details: e.to_string(),
            })?;
        manifest.validate_schema()?;
        Ok(manifest)
    }

    /// Serialize to a JSON value
    pub fn to_json(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| ConveyorError::ParseError {
            details: e.to_string(),
        })
    }

    fn validate_schema(&self) -> Result<()> {
        if self.schema != SCHEMA_V01 {
            return Err(ConveyorError::InvalidSchemaVersion {
                expected: SCHEMA_V01.to_string(),
                actual: self.schema.clone(),
            });
        }
        Ok(())
    }

    /// Re-link against registered components and rebuild the pipeline.
    ///
    /// Each referenced component must be registered under the same name with
    /// identical port metadata; the result still goes through `compile` (or
    /// `Runner::new`) like any authored pipeline.
    pub fn into_pipeline(&self, registry: &ComponentRegistry) -> Result<Pipeline> {
        self.validate_schema()?;

        // Port metadata must agree with what is registered
        let mut descriptors = FxHashMap::default();
        for component in &self.components {
            let registered = registry.get(&component.name).ok_or_else(|| {
                ConveyorError::UnknownComponent {
                    component: component.name.clone(),
                    task_id: self
                        .tasks
                        .iter()
                        .find(|t| t.component == component.name)
                        .map(|t| t.id.clone())
                        .unwrap_or_default(),
                }
            })?;

            if registered.inputs() != component.inputs.as_slice() {
                return Err(ConveyorError::ManifestMismatch {
                    component: component.name.clone(),
                    reason: "input ports differ".to_string(),
                });
            }
            if registered.outputs() != component.outputs.as_slice() {
                return Err(ConveyorError::ManifestMismatch {
                    component: component.name.clone(),
                    reason: "output ports differ".to_string(),
                });
            }

            descriptors.insert(component.name.clone(), registered);
        }

        // Producer descriptor per task id, for normalizing output references
        let component_of: FxHashMap<&str, &Arc<crate::component::ComponentDescriptor>> = self
            .tasks
            .iter()
            .filter_map(|t| descriptors.get(&t.component).map(|d| (t.id.as_str(), d)))
            .collect();

        let mut ids: FxHashSet<Arc<str>> = FxHashSet::default();
        let mut tasks = Vec::with_capacity(self.tasks.len());
        for (index, task) in self.tasks.iter().enumerate() {
            let component = descriptors.get(&task.component).cloned().ok_or_else(|| {
                ConveyorError::UnknownComponent {
                    component: task.component.clone(),
                    task_id: task.id.clone(),
                }
            })?;

            let id = intern(&task.id);
            if !ids.insert(Arc::clone(&id)) {
                return Err(ConveyorError::DuplicateTask {
                    task_id: task.id.clone(),
                });
            }

            // Normalize keys to raw port names, exactly like the builder
            let mut arguments = FxHashMap::default();
            for (key, binding) in &task.arguments {
                let port = component.input(key).ok_or_else(|| ConveyorError::UnknownPort {
                    task_id: task.id.clone(),
                    component: component.name().to_string(),
                    port: key.clone(),
                })?;
                let arg = match binding {
                    ManifestArgument::Literal { literal } => ArgumentRef::Literal(literal.clone()),
                    ManifestArgument::Output { from, output } => {
                        // Display names normalize to the raw port name; unknown
                        // names pass through for `compile` to reject properly
                        let output = component_of
                            .get(from.as_str())
                            .and_then(|d| d.output(output))
                            .map(|p| p.name.clone())
                            .unwrap_or_else(|| output.clone());
                        ArgumentRef::Output(OutputRef {
                            task: intern(from),
                            output,
                        })
                    }
                };
                if arguments.insert(port.name.clone(), arg).is_some() {
                    return Err(ConveyorError::DuplicateArgument {
                        task_id: task.id.clone(),
                        port: port.name.clone(),
                    });
                }
            }

            tasks.push(Arc::new(Task {
                id,
                index,
                component,
                arguments,
            }));
        }

        Ok(Pipeline::new(self.name.clone(), tasks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecRegistry;
    use crate::component::{Captured, ComponentDescriptor, DataType, FnInvoke, Port};
    use crate::pipeline::PipelineBuilder;
    use pretty_assertions::assert_eq;

    fn registry_and_pipeline() -> (ComponentRegistry, Pipeline) {
        let codecs = CodecRegistry::with_builtins();
        let registry = ComponentRegistry::new();

        let gen = ComponentDescriptor::new(
            "write_numbers",
            vec![
                Port::value("start", DataType::Integer).with_default("0"),
                Port::value("count", DataType::Integer),
            ],
            vec![Port::artifact("numbers_path", DataType::List)],
            FnInvoke::new(|_| Ok(Captured::none())),
            &codecs,
        )
        .unwrap();
        let sum = ComponentDescriptor::new(
            "sum_numbers",
            vec![Port::artifact("numbers_path", DataType::List)],
            vec![Port::value("total", DataType::Integer)],
            FnInvoke::new(|_| Ok(Captured::single(0))),
            &codecs,
        )
        .unwrap();

        registry.register(Arc::clone(&gen)).unwrap();
        registry.register(Arc::clone(&sum)).unwrap();

        let mut builder = PipelineBuilder::new("numbers_demo");
        let write = builder
            .add_task("write", &gen, vec![("count", ArgumentRef::literal(5))])
            .unwrap();
        builder
            .add_task(
                "sum",
                &sum,
                vec![("numbers", write.output("numbers").unwrap().into())],
            )
            .unwrap();

        (registry, builder.finish())
    }

    // ═══════════════════════════════════════════════════════════════
    // ROUND-TRIP TESTS
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn yaml_round_trip_is_lossless() {
        let (registry, pipeline) = registry_and_pipeline();

        let manifest = PipelineManifest::from_pipeline(&pipeline).unwrap();
        let yaml = manifest.to_yaml().unwrap();
        let reloaded = PipelineManifest::from_yaml(&yaml).unwrap();
        assert_eq!(manifest, reloaded);

        // And back into an executable pipeline with identical structure
        let rebuilt = reloaded.into_pipeline(&registry).unwrap();
        assert_eq!(rebuilt.name(), pipeline.name());
        assert_eq!(rebuilt.tasks().len(), pipeline.tasks().len());
        assert_eq!(rebuilt.fingerprint(), pipeline.fingerprint());

        // Bindings survived exactly
        let sum = rebuilt.task("sum").unwrap();
        match &sum.arguments["numbers_path"] {
            ArgumentRef::Output(r) => {
                assert_eq!(&*r.task, "write");
                assert_eq!(r.output, "numbers_path");
            }
            other => panic!("expected output binding, got {:?}", other),
        }
    }

    #[test]
    fn manifest_records_order_and_type_tags() {
        let (_registry, pipeline) = registry_and_pipeline();
        let manifest = PipelineManifest::from_pipeline(&pipeline).unwrap();

        assert_eq!(manifest.order, vec!["write".to_string(), "sum".to_string()]);

        let gen = manifest
            .components
            .iter()
            .find(|c| c.name == "write_numbers")
            .unwrap();
        assert_eq!(gen.outputs[0].data_type, DataType::List);
    }

    #[test]
    fn manifest_is_only_produced_for_compilable_pipelines() {
        let codecs = CodecRegistry::with_builtins();
        let producer = ComponentDescriptor::new(
            "gen",
            vec![],
            vec![Port::value("count", DataType::Integer)],
            FnInvoke::new(|_| Ok(Captured::single(0))),
            &codecs,
        )
        .unwrap();
        let consumer = ComponentDescriptor::new(
            "use_text",
            vec![Port::value("text", DataType::String)],
            vec![],
            FnInvoke::new(|_| Ok(Captured::none())),
            &codecs,
        )
        .unwrap();

        let mut builder = PipelineBuilder::new("bad");
        let gen = builder.add_task("gen", &producer, vec![]).unwrap();
        builder
            .add_task(
                "use",
                &consumer,
                vec![("text", gen.output("count").unwrap().into())],
            )
            .unwrap();

        // integer → string tags disagree; no manifest, no partial plan
        let err = PipelineManifest::from_pipeline(&builder.finish()).unwrap_err();
        assert!(err.to_string().contains("CNV-023"));
    }

    // ═══════════════════════════════════════════════════════════════
    // SCHEMA/RELINK VALIDATION
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn wrong_schema_version_rejected() {
        let (_registry, pipeline) = registry_and_pipeline();
        let mut manifest = PipelineManifest::from_pipeline(&pipeline).unwrap();
        manifest.schema = "conveyor/pipeline@9.9".to_string();

        let yaml = serde_yaml::to_string(&manifest).unwrap();
        let err = PipelineManifest::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("CNV-002"));
    }

    #[test]
    fn malformed_yaml_rejected() {
        let err = PipelineManifest::from_yaml(": definitely not\n  a manifest").unwrap_err();
        assert!(err.to_string().contains("CNV-001"));
    }

    #[test]
    fn unregistered_component_rejected_on_relink() {
        let (_registry, pipeline) = registry_and_pipeline();
        let manifest = PipelineManifest::from_pipeline(&pipeline).unwrap();

        let empty = ComponentRegistry::new();
        let err = manifest.into_pipeline(&empty).unwrap_err();
        assert!(err.to_string().contains("CNV-003"));
    }

    #[test]
    fn port_metadata_drift_rejected_on_relink() {
        let (_registry, pipeline) = registry_and_pipeline();
        let manifest = PipelineManifest::from_pipeline(&pipeline).unwrap();

        // Same names, different port tables
        let codecs = CodecRegistry::with_builtins();
        let drifted = ComponentRegistry::new();
        drifted
            .register(
                ComponentDescriptor::new(
                    "write_numbers",
                    vec![Port::value("count", DataType::Integer)],
                    vec![Port::artifact("numbers_path", DataType::List)],
                    FnInvoke::new(|_| Ok(Captured::none())),
                    &codecs,
                )
                .unwrap(),
            )
            .unwrap();
        drifted
            .register(
                ComponentDescriptor::new(
                    "sum_numbers",
                    vec![Port::artifact("numbers_path", DataType::List)],
                    vec![Port::value("total", DataType::Integer)],
                    FnInvoke::new(|_| Ok(Captured::single(0))),
                    &codecs,
                )
                .unwrap(),
            )
            .unwrap();

        let err = manifest.into_pipeline(&drifted).unwrap_err();
        assert!(err.to_string().contains("CNV-004"));
    }
}
