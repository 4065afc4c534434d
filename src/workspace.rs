//! Scratch workspace lifecycle.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::Result;

/// Per-task directory tree, recreated from nothing for every task.
#[derive(Debug, Clone)]
pub struct ScratchWorkspace {
    pub root: PathBuf,
    /// Checkout of the pushed repository
    pub repo_dir: PathBuf,
    /// Decompiled sources; a git repository of its own
    pub output_dir: PathBuf,
    /// Parent ids of the after-commit
    pub last_commit_file: PathBuf,
    pub diff_file: PathBuf,
}

impl ScratchWorkspace {
    pub const REPO_DIR_NAME: &'static str = "repo";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            repo_dir: root.join(Self::REPO_DIR_NAME),
            output_dir: root.join("output"),
            last_commit_file: root.join("lastcommit"),
            diff_file: root.join("out.diff"),
            root,
        }
    }

    /// Delete whatever is at `root` and create an empty tree.
    pub async fn reset(&self) -> Result<()> {
        remove_tree(&self.root).await?;
        fs::create_dir_all(&self.root).await?;
        fs::create_dir_all(&self.output_dir).await?;
        debug!("Scratch workspace ready at {}", self.root.display());
        Ok(())
    }

    /// Delete the whole tree. A missing tree is not an error.
    pub async fn destroy(&self) -> Result<()> {
        remove_tree(&self.root).await
    }

    pub fn exists(&self) -> bool {
        self.root.exists()
    }
}

/// Recursively remove `path`; succeeds if it is already gone.
pub async fn remove_tree(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
