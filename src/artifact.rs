//! Build artifact discovery.

use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{DiffError, Result};

/// File names containing any of these are secondary build outputs.
pub const EXCLUDED_TERMS: [&str; 5] = ["slim", "javadoc", "sources", "all", "test-fixtures"];

/// True for `<name>.<extension>` files whose name has no excluded term.
/// Matching is case-sensitive.
pub fn is_candidate(file_name: &str, extension: &str) -> bool {
    let has_extension = file_name
        .strip_suffix(extension)
        .is_some_and(|stem| stem.ends_with('.'));
    has_extension && !EXCLUDED_TERMS.iter().any(|term| file_name.contains(term))
}

/// Artifacts found under a build output directory, in file-name order.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    root: PathBuf,
    paths: Vec<PathBuf>,
}

impl ArtifactSet {
    /// Walk `root` and collect every candidate artifact.
    ///
    /// Logs a warning unless exactly one is found; the caller decides what to
    /// do with zero or several.
    pub fn locate(root: &Path, extension: &str) -> Result<Self> {
        if !root.is_dir() {
            return Err(DiffError::ArtifactNotFound(root.to_path_buf()));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if is_candidate(&entry.file_name().to_string_lossy(), extension) {
                paths.push(entry.into_path());
            }
        }

        if paths.len() != 1 {
            warn!(
                "Found {} build artifacts under {} (expected exactly 1): {:?}",
                paths.len(),
                root.display(),
                paths
            );
        }

        Ok(Self {
            root: root.to_path_buf(),
            paths,
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The artifact the pipeline decompiles: the first one found.
    pub fn primary(&self) -> Result<&Path> {
        self.paths
            .first()
            .map(PathBuf::as_path)
            .ok_or_else(|| DiffError::ArtifactNotFound(self.root.clone()))
    }
}
