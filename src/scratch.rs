// src/scratch.rs

//! Working storage for materialized codebases and writer checkouts
//!
//! One temporary root lives as long as the [`Scratch`] value; every
//! directory handed out is a fresh, uniquely named child of it. Dropping
//! the scratch removes everything created through it, unless it was
//! created with [`Scratch::kept`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Scratch {
    root: TempDir,
    counter: AtomicUsize,
}

impl Scratch {
    /// Create scratch storage under the system temporary directory
    pub fn new() -> io::Result<Self> {
        Self::from_tempdir(tempfile::Builder::new().prefix("migrant-").tempdir()?)
    }

    /// Create scratch storage under `parent`
    pub fn new_in(parent: &Path) -> io::Result<Self> {
        Self::from_tempdir(tempfile::Builder::new().prefix("migrant-").tempdir_in(parent)?)
    }

    /// Create scratch storage that survives this value, for working copies
    /// the user inspects after the process exits
    pub fn kept() -> io::Result<Self> {
        let root = tempfile::Builder::new()
            .prefix("migrant-")
            .disable_cleanup(true)
            .tempdir()?;
        info!("Working copies are kept under {}", root.path().display());
        Self::from_tempdir(root)
    }

    fn from_tempdir(root: TempDir) -> io::Result<Self> {
        debug!("Scratch storage at {}", root.path().display());
        Ok(Self {
            root,
            counter: AtomicUsize::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Create and return a new empty directory named after `prefix`
    pub fn dir(&self, prefix: &str) -> io::Result<PathBuf> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let path = self.root.path().join(format!("{}_{}", sanitize(prefix), n));
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Reserve a path for a file named after `prefix` without creating it
    pub fn file(&self, prefix: &str) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.root.path().join(format!("{}_{}", sanitize(prefix), n))
    }
}

fn sanitize(prefix: &str) -> String {
    prefix
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
