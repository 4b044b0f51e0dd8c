//! Runtime Configuration
//!
//! Environment-driven knobs for embedding hosts. A `.env` file is honored
//! via dotenvy; real environment variables take precedence.
//!
//! | variable                  | meaning                                   |
//! |---------------------------|-------------------------------------------|
//! | `CONVEYOR_ARTIFACT_ROOT`  | directory for artifact files (kept)       |
//! | `CONVEYOR_KEEP_ARTIFACTS` | `1`/`true`: keep the temp artifact root   |

use camino::Utf8PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeConfig {
    /// Explicit artifact root; `None` means an ephemeral temp directory
    pub artifact_root: Option<Utf8PathBuf>,
    /// Keep the temp artifact root after the run (inspection/debugging)
    pub keep_artifacts: bool,
}

impl RuntimeConfig {
    /// Load configuration from the environment (and `.env`, if present)
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let artifact_root = std::env::var("CONVEYOR_ARTIFACT_ROOT")
            .ok()
            .filter(|s| !s.is_empty())
            .map(Utf8PathBuf::from);

        let keep_artifacts = std::env::var("CONVEYOR_KEEP_ARTIFACTS")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            artifact_root,
            keep_artifacts,
        }
    }
}
