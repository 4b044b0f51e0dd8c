//! Runtime Module - plan execution
//!
//! - `runner`: ready-loop executor (`Runner`, `RunSummary`)

mod runner;

pub use runner::{RunSummary, Runner};
