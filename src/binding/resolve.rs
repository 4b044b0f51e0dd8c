//! Argument Binder - execution-time staging of task inputs and outputs
//!
//! Runs inside each spawned task, after every producer has settled:
//! - value literal → canonical string via the declared type's codec
//! - value ← upstream value: the produced string, passed unchanged
//! - value ← upstream artifact: the file's UTF-8 contents
//! - artifact ← upstream artifact: the producer's path (checked to exist)
//! - artifact ← literal or upstream value: spilled to a fresh path
//! - artifact outputs: fresh path allocated *before* the unit runs
//!
//! The unit receives paths as strings, never raw bytes; value outputs come
//! back positionally and are serialized to canonical strings here.

use std::time::Duration;

use camino::Utf8PathBuf;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::codec::CodecRegistry;
use crate::component::{Captured, Invocation, Port, PortKind};
use crate::error::{ConveyorError, Result};
use crate::pipeline::{ArgumentRef, OutputRef, Task};
use crate::store::{ArtifactStore, DataStore, TaskResult};

/// Stage every input of `task` and allocate its artifact output paths.
///
/// Producers must already be settled successfully in `datastore`; the
/// runtime's ready-loop guarantees that ordering.
pub fn bind_arguments(
    task: &Task,
    datastore: &DataStore,
    store: &dyn ArtifactStore,
    codecs: &CodecRegistry,
    cancel: CancellationToken,
) -> Result<Invocation> {
    let mut args: FxHashMap<String, String> = FxHashMap::default();
    let mut input_paths: FxHashMap<String, Utf8PathBuf> = FxHashMap::default();
    let mut output_paths: FxHashMap<String, Utf8PathBuf> = FxHashMap::default();

    for port in task.component.inputs() {
        match task.arguments.get(&port.name) {
            None => bind_unbound(task, port, store, &mut args, &mut input_paths)?,
            Some(ArgumentRef::Literal(value)) => {
                bind_literal(port, value, store, codecs, &mut args, &mut input_paths)?
            }
            Some(ArgumentRef::Output(r)) => bind_upstream(
                task,
                port,
                r,
                datastore,
                store,
                &mut args,
                &mut input_paths,
            )?,
        }
    }

    // Allocate every artifact output path up front; the unit writes there
    for port in task.component.artifact_outputs() {
        output_paths.insert(port.name.clone(), store.allocate()?);
    }

    trace!(
        task = %task.id,
        args = args.len(),
        inputs = input_paths.len(),
        outputs = output_paths.len(),
        "arguments bound"
    );

    Ok(Invocation {
        args,
        input_paths,
        output_paths,
        cancel,
    })
}

/// Unbound port: fall back to the default, or stay absent when optional
fn bind_unbound(
    task: &Task,
    port: &Port,
    store: &dyn ArtifactStore,
    args: &mut FxHashMap<String, String>,
    input_paths: &mut FxHashMap<String, Utf8PathBuf>,
) -> Result<()> {
    if let Some(default) = &port.default {
        match port.kind {
            PortKind::Value => {
                args.insert(port.name.clone(), default.clone());
            }
            PortKind::Artifact => {
                let path = store.write(default.as_bytes())?;
                input_paths.insert(port.name.clone(), path);
            }
        }
        return Ok(());
    }

    if port.optional {
        return Ok(());
    }

    // The builder enforces this; manifests loaded from outside may not have
    // passed through it, so keep the check.
    Err(ConveyorError::MissingRequiredInput {
        task_id: task.id.to_string(),
        port: port.name.clone(),
    })
}

/// Literal argument: serialize for value ports, spill to a file for artifacts
fn bind_literal(
    port: &Port,
    value: &Value,
    store: &dyn ArtifactStore,
    codecs: &CodecRegistry,
    args: &mut FxHashMap<String, String>,
    input_paths: &mut FxHashMap<String, Utf8PathBuf>,
) -> Result<()> {
    match port.kind {
        PortKind::Value => {
            let encoded = codecs.encode(&port.data_type, value)?;
            args.insert(port.name.clone(), encoded);
        }
        PortKind::Artifact => {
            let bytes = literal_bytes(port, value, codecs)?;
            let path = store.write(&bytes)?;
            input_paths.insert(port.name.clone(), path);
        }
    }
    Ok(())
}

/// Content written when a literal is spilled to an artifact path.
///
/// Uses the declared type's codec when one exists; otherwise strings are
/// written raw and anything else as compact JSON (opaque artifact types
/// carry no codec by design).
fn literal_bytes(port: &Port, value: &Value, codecs: &CodecRegistry) -> Result<Vec<u8>> {
    if codecs.contains(&port.data_type) {
        return Ok(codecs.encode(&port.data_type, value)?.into_bytes());
    }
    match value {
        Value::String(s) => Ok(s.clone().into_bytes()),
        other => Ok(other.to_string().into_bytes()),
    }
}

/// Upstream output: pass through, stage, or adapt across kinds
fn bind_upstream(
    task: &Task,
    port: &Port,
    r: &OutputRef,
    datastore: &DataStore,
    store: &dyn ArtifactStore,
    args: &mut FxHashMap<String, String>,
    input_paths: &mut FxHashMap<String, Utf8PathBuf>,
) -> Result<()> {
    let upstream = datastore
        .get(&r.task)
        .ok_or_else(|| ConveyorError::UnknownTask {
            task_id: task.id.to_string(),
            producer: r.task.to_string(),
        })?;

    if let Some(produced) = upstream.value(&r.output) {
        // Upstream value output: strings pass through unchanged
        match port.kind {
            PortKind::Value => {
                args.insert(port.name.clone(), produced.to_string());
            }
            PortKind::Artifact => {
                let path = store.write(produced.as_bytes())?;
                input_paths.insert(port.name.clone(), path);
            }
        }
        return Ok(());
    }

    if let Some(path) = upstream.artifact(&r.output) {
        // The producer finished without the runtime checking its writes;
        // consumption is where a missing artifact surfaces.
        if !store.exists(path) {
            return Err(ConveyorError::MissingOutputArtifact {
                producer: r.task.to_string(),
                output: r.output.clone(),
                consumer: task.id.to_string(),
                path: path.to_string(),
            });
        }

        match port.kind {
            PortKind::Artifact => {
                input_paths.insert(port.name.clone(), path.to_owned());
            }
            PortKind::Value => {
                let bytes = store.read(path)?;
                let text = String::from_utf8(bytes).map_err(|e| ConveyorError::Serialization {
                    data_type: port.data_type.tag().to_string(),
                    reason: format!("artifact at '{}' is not UTF-8: {}", path, e),
                })?;
                args.insert(port.name.clone(), text);
            }
        }
        return Ok(());
    }

    // Compilation validated the port name, so this only fires on results
    // that bypassed capture (a bug, not a user error).
    Err(ConveyorError::UnknownOutput {
        task_id: task.id.to_string(),
        producer: r.task.to_string(),
        output: r.output.clone(),
    })
}

/// Distribute and serialize a unit's outputs into a settled result.
///
/// Value outputs are positional, in declaration order; artifact outputs are
/// the paths allocated before the run (existence deliberately unchecked).
pub fn capture_outputs(
    task: &Task,
    captured: Captured,
    output_paths: FxHashMap<String, Utf8PathBuf>,
    codecs: &CodecRegistry,
    duration: Duration,
) -> Result<TaskResult> {
    let declared: Vec<&Port> = task.component.value_outputs().collect();

    if captured.values.len() != declared.len() {
        return Err(ConveyorError::OutputArity {
            task_id: task.id.to_string(),
            component: task.component.name().to_string(),
            expected: declared.len(),
            actual: captured.values.len(),
        });
    }

    let mut values: FxHashMap<String, String> = FxHashMap::default();
    for (port, value) in declared.into_iter().zip(captured.values.iter()) {
        let encoded = codecs.encode(&port.data_type, value)?;
        values.insert(port.name.clone(), encoded);
    }

    Ok(TaskResult::success(values, output_paths, duration))
}
