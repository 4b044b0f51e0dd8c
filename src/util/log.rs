//! Tracing initialization helper
//!
//! Opt-in: libraries should never install a global subscriber on their own,
//! so this is a convenience for binaries and tests embedding the runtime.
//! Filtering follows `RUST_LOG` (e.g. `RUST_LOG=conveyor=debug`).

use tracing_subscriber::{fmt, EnvFilter};

/// Install a global `tracing` subscriber with env-filter support.
///
/// Safe to call more than once: subsequent calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
