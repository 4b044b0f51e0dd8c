//! Store Module - run-time state
//!
//! - `artifact`: the storage collaborator (`ArtifactStore`, local impl)
//! - `datastore`: settled task results (`DataStore`, `TaskResult`)

mod artifact;
mod datastore;

pub use artifact::{ArtifactStore, LocalArtifactStore};
pub use datastore::{DataStore, TaskResult, TaskStatus};
