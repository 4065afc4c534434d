//! Download manifest (`dlmanifest.txt`) and the local artifact cache.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{DiffError, Result};

/// One artifact source URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub url: String,
}

impl ManifestEntry {
    /// Everything after the last `/`.
    pub fn file_name(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }

    /// File name without its extension; names the decompiler output directory.
    pub fn short_name(&self) -> &str {
        let file_name = self.file_name();
        match file_name.rfind('.') {
            Some(dot) if dot > 0 => &file_name[..dot],
            _ => file_name,
        }
    }
}

/// Ordered list of artifact URLs, one per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| ManifestEntry {
                url: line.to_string(),
            })
            .collect();
        Self { entries }
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).await.map_err(|e| {
            DiffError::ManifestError(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Ok(Self::parse(&text))
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Download every entry that is not already in `input_dir`.
    ///
    /// An entry counts as cached when an existing file name contains its file
    /// name. Returns how many files were downloaded.
    pub async fn ensure_cached(&self, client: &reqwest::Client, input_dir: &Path) -> Result<usize> {
        fs::create_dir_all(input_dir).await?;
        let existing = cached_names(input_dir).await?;

        let mut downloaded = 0;
        for entry in &self.entries {
            let file_name = entry.file_name();
            if file_name.is_empty() {
                return Err(DiffError::ManifestError(format!(
                    "Cannot derive a file name from '{}'",
                    entry.url
                )));
            }
            if existing.iter().any(|name| name.contains(file_name)) {
                debug!("{} already cached", file_name);
                continue;
            }

            info!("Downloading {} from {}", file_name, entry.url);
            let bytes = client
                .get(&entry.url)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;

            let target = input_dir.join(file_name);
            let partial = input_dir.join(format!(".{}.part", file_name));
            fs::write(&partial, &bytes).await?;
            fs::rename(&partial, &target).await?;
            downloaded += 1;
        }

        Ok(downloaded)
    }
}

async fn cached_names(input_dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut dir = fs::read_dir(input_dir).await?;
    while let Some(entry) = dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        // Leftovers from an interrupted download
        if name.ends_with(".part") {
            continue;
        }
        names.push(name);
    }
    Ok(names)
}

/// Path of the cached copy of `entry`.
pub fn cached_path(input_dir: &Path, entry: &ManifestEntry) -> PathBuf {
    input_dir.join(entry.file_name())
}
