//! Component Module - typed unit declarations
//!
//! A component declares named, typed inputs and outputs (ports) and owns an
//! invocation target. Registration-time validation means a descriptor that
//! exists is a descriptor the runtime can execute: port names are unique and
//! snake_case, and every value port has a codec for its declared type.

mod descriptor;
mod port;

pub use descriptor::{
    Captured, ComponentDescriptor, ComponentRegistry, FnInvoke, Invocation, Invoke,
};
pub use port::{DataType, Port, PortKind};
