//! Event Module - run observability
//!
//! Append-only audit trail of one pipeline execution, serializable to JSON
//! for external tooling. Not a UI: consumers decide what to render.

mod log;

pub use log::{Event, EventKind, EventLog};
