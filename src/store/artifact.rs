//! Artifact Store - the storage collaborator behind artifact ports
//!
//! The runtime only needs three operations and path stability for the
//! duration of a run; everything else (retention, remote stores, content
//! addressing) belongs to the collaborator behind the trait.

use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::config::RuntimeConfig;
use crate::error::{ConveyorError, Result};

/// Storage collaborator contract
///
/// Paths returned by `allocate`/`write` must stay valid for the duration of
/// a run. Each output path is allocated exactly once and written by exactly
/// one task, so implementations need no write coordination.
pub trait ArtifactStore: Send + Sync {
    /// Reserve a fresh, unique path without creating the file
    fn allocate(&self) -> Result<Utf8PathBuf>;

    /// Write bytes to a freshly allocated path and return it
    fn write(&self, bytes: &[u8]) -> Result<Utf8PathBuf>;

    /// Read back the bytes at a path
    fn read(&self, path: &Utf8Path) -> Result<Vec<u8>>;

    /// Whether anything was written at a path
    fn exists(&self, path: &Utf8Path) -> bool {
        path.as_std_path().exists()
    }
}

/// Local filesystem store rooted in a per-run directory
pub struct LocalArtifactStore {
    root: Utf8PathBuf,
    counter: AtomicU64,
    /// Remove the root on drop (only when this store created it)
    ephemeral: bool,
}

impl LocalArtifactStore {
    /// Store rooted at an existing or creatable directory; the caller owns
    /// the directory's lifetime.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            counter: AtomicU64::new(0),
            ephemeral: false,
        })
    }

    /// Store rooted in a fresh temp directory, removed on drop
    pub fn ephemeral() -> Result<Self> {
        let dir = std::env::temp_dir().join(format!("conveyor-{}", Uuid::new_v4().simple()));
        let root = Utf8PathBuf::from_path_buf(dir).map_err(|p| ConveyorError::Store {
            reason: format!("temp dir is not valid UTF-8: {}", p.display()),
        })?;
        fs::create_dir_all(&root)?;
        debug!(%root, "created ephemeral artifact root");
        Ok(Self {
            root,
            counter: AtomicU64::new(0),
            ephemeral: true,
        })
    }

    /// Store honoring the runtime configuration: an explicit artifact root
    /// is used as-is (and kept); otherwise a temp root is created and
    /// removed on drop unless `keep_artifacts` is set.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        match &config.artifact_root {
            Some(root) => Self::new(root.clone()),
            None => {
                let mut store = Self::ephemeral()?;
                if config.keep_artifacts {
                    store.ephemeral = false;
                }
                Ok(store)
            }
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn allocate(&self) -> Result<Utf8PathBuf> {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(self.root.join(format!("artifact-{:06}", seq)))
    }

    fn write(&self, bytes: &[u8]) -> Result<Utf8PathBuf> {
        let path = self.allocate()?;
        fs::write(&path, bytes)?;
        Ok(path)
    }

    fn read(&self, path: &Utf8Path) -> Result<Vec<u8>> {
        Ok(fs::read(path)?)
    }
}

impl Drop for LocalArtifactStore {
    fn drop(&mut self) {
        if self.ephemeral {
            let _ = fs::remove_dir_all(&self.root);
        }
    }
}
