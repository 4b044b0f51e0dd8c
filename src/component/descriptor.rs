//! Component Descriptor - reusable declaration of a typed processing unit
//!
//! Construction *is* registration: all port validation (name uniqueness,
//! snake_case identifiers, codec availability for value types) happens here,
//! never at run time. The descriptor is immutable afterwards.
//!
//! The invocation target is deliberately abstract: the core only needs the
//! callable contract below and does not care whether the unit is a process,
//! a container, or a plain function.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use dashmap::DashMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::codec::CodecRegistry;
use crate::error::{ConveyorError, Result};
use crate::util::snake_case_violation;

use super::port::{Port, PortKind};

/// Everything a unit receives for one execution
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Value inputs, serialized to canonical strings, keyed by raw port name
    pub args: FxHashMap<String, String>,
    /// Artifact input paths, keyed by raw port name
    pub input_paths: FxHashMap<String, Utf8PathBuf>,
    /// Pre-allocated artifact output paths, keyed by raw port name;
    /// the unit is expected to write its outputs there
    pub output_paths: FxHashMap<String, Utf8PathBuf>,
    /// Best-effort cancellation signal for long-running units
    pub cancel: CancellationToken,
}

/// Value outputs captured from one execution
///
/// Multi-output units return one value per declared value output,
/// in declaration order. Artifact outputs are whatever the unit wrote
/// at its `output_paths` - nothing to return here.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    pub values: Vec<Value>,
}

impl Captured {
    /// A unit with no value outputs
    pub fn none() -> Self {
        Self::default()
    }

    /// A unit with a single value output
    pub fn single(value: impl Into<Value>) -> Self {
        Self {
            values: vec![value.into()],
        }
    }

    pub fn values(values: Vec<Value>) -> Self {
        Self { values }
    }
}

/// Callable contract for a unit
///
/// `invoke(serialized_args, artifact_paths) -> captured_values`; artifact
/// outputs are the caller's responsibility to read back from the paths.
#[async_trait]
pub trait Invoke: Send + Sync {
    async fn invoke(&self, invocation: Invocation) -> Result<Captured>;
}

/// Adapter for units implemented as plain synchronous functions
pub struct FnInvoke<F>(F);

impl<F> FnInvoke<F>
where
    F: Fn(Invocation) -> Result<Captured> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Arc<dyn Invoke> {
        Arc::new(Self(f))
    }
}

#[async_trait]
impl<F> Invoke for FnInvoke<F>
where
    F: Fn(Invocation) -> Result<Captured> + Send + Sync,
{
    async fn invoke(&self, invocation: Invocation) -> Result<Captured> {
        (self.0)(invocation)
    }
}

/// Reusable declaration of a unit's typed inputs/outputs and its
/// invocation target. Immutable once created.
pub struct ComponentDescriptor {
    name: String,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    invoke: Arc<dyn Invoke>,
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

impl ComponentDescriptor {
    /// Validate and construct a descriptor.
    ///
    /// Fails with:
    /// - `InvalidName` on non-snake_case component/port names
    /// - `DuplicatePort` on repeated names within inputs or within outputs
    /// - `CodecMissing` when a value port's type has no codec in `codecs`
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<Port>,
        outputs: Vec<Port>,
        invoke: Arc<dyn Invoke>,
        codecs: &CodecRegistry,
    ) -> Result<Arc<Self>> {
        let name = name.into();

        if let Some(reason) = snake_case_violation(&name) {
            return Err(ConveyorError::InvalidName {
                name,
                reason: reason.to_string(),
            });
        }

        validate_ports(&name, "input", &inputs, codecs)?;
        validate_ports(&name, "output", &outputs, codecs)?;

        Ok(Arc::new(Self {
            name,
            inputs,
            outputs,
            invoke,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    pub fn invoker(&self) -> &Arc<dyn Invoke> {
        &self.invoke
    }

    /// Find an input port by raw or display name
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.matches_name(name))
    }

    /// Find an output port by raw or display name
    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.matches_name(name))
    }

    /// Value outputs in declaration order (capture order for multi-output units)
    pub fn value_outputs(&self) -> impl Iterator<Item = &Port> {
        self.outputs.iter().filter(|p| p.kind == PortKind::Value)
    }

    /// Artifact outputs in declaration order
    pub fn artifact_outputs(&self) -> impl Iterator<Item = &Port> {
        self.outputs.iter().filter(|p| p.kind == PortKind::Artifact)
    }
}

fn validate_ports(
    component: &str,
    direction: &'static str,
    ports: &[Port],
    codecs: &CodecRegistry,
) -> Result<()> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();

    for port in ports {
        if let Some(reason) = snake_case_violation(&port.name) {
            return Err(ConveyorError::InvalidName {
                name: port.name.clone(),
                reason: reason.to_string(),
            });
        }

        if !seen.insert(&port.name) {
            return Err(ConveyorError::DuplicatePort {
                component: component.to_string(),
                direction,
                port: port.name.clone(),
            });
        }

        // A value port without a codec for its declared type is an authoring
        // error, reported here rather than at run time.
        if port.kind == PortKind::Value && !codecs.contains(&port.data_type) {
            return Err(ConveyorError::CodecMissing {
                component: component.to_string(),
                port: port.name.clone(),
                data_type: port.data_type.tag().to_string(),
            });
        }
    }

    Ok(())
}

/// Component lookup by name (lock-free), used to re-link manifests
/// to their invocation targets.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    components: Arc<DashMap<String, Arc<ComponentDescriptor>>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under its component name
    pub fn register(&self, descriptor: Arc<ComponentDescriptor>) -> Result<()> {
        use dashmap::mapref::entry::Entry;

        match self.components.entry(descriptor.name().to_string()) {
            Entry::Occupied(_) => Err(ConveyorError::DuplicateComponent {
                component: descriptor.name().to_string(),
            }),
            Entry::Vacant(e) => {
                e.insert(descriptor);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ComponentDescriptor>> {
        self.components.get(name).map(|c| Arc::clone(c.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
