//! Marker-path idempotence.
//!
//! A step is considered complete when its marker path exists. Nothing about
//! the content or version of what exists is checked; delete the marker to
//! force the step to run again.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Answers whether a marker path exists.
pub trait MarkerFs {
    fn exists(&self, path: &Path) -> bool;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFs;

impl MarkerFs for HostFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// In-memory marker set.
#[derive(Debug, Clone, Default)]
pub struct MemoryMarkers {
    present: BTreeSet<PathBuf>,
}

impl MemoryMarkers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>) {
        self.present.insert(path.into());
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        self.present.remove(path)
    }
}

impl MarkerFs for MemoryMarkers {
    fn exists(&self, path: &Path) -> bool {
        self.present.contains(path)
    }
}

/// Decides per marker whether a step has to run.
#[derive(Debug, Clone, Copy)]
pub struct FreshnessGate<F> {
    fs: F,
}

impl<F: MarkerFs> FreshnessGate<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    pub fn is_step_complete(&self, marker: &Path) -> bool {
        self.fs.exists(marker)
    }

    /// `true` when the step must run. Announces the skip otherwise.
    pub fn needs_run(&self, marker: &Path) -> bool {
        if self.is_step_complete(marker) {
            println!("Found \"{}\", skip downloading...", marker.display());
            debug!(marker = %marker.display(), "step already complete");
            return false;
        }
        true
    }
}

impl Default for FreshnessGate<HostFs> {
    fn default() -> Self {
        Self::new(HostFs)
    }
}
