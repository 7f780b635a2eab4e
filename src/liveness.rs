//! Liveness footprints
//!
//! Each worker stamps a small file with the current epoch second whenever
//! it makes progress. An external health checker compares the stamp
//! against its own clock.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Footprint {
    path: PathBuf,
}

impl Footprint {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stamp the file with the current time. Failures are logged, not
    /// propagated, so a full disk never stops the pipeline.
    pub fn touch(&self) {
        if let Err(err) = self.write_now() {
            warn!("liveness stamp {} failed: {:#}", self.path.display(), err);
        }
    }

    fn write_now(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("clock before epoch")?
            .as_secs();
        std::fs::write(&self.path, format!("{}\n", now))
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}
