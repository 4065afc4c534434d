use std::io;
use std::path::PathBuf;

/// Custom error type for decomp_diff operations
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("Command failed: {command}\n{message}")]
    CommandFailed { command: String, message: String },

    #[error("Failed to start command '{command}': {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid commit identifier: {0:?}")]
    InvalidCommit(String),

    #[error("No build artifact found under {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("Decompiler produced no output for '{0}'")]
    DecompileOutputMissing(String),

    #[error("Manifest error: {0}")]
    ManifestError(String),

    #[error("Task queue is closed")]
    QueueClosed,

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Directory walk failed: {0}")]
    WalkError(#[from] walkdir::Error),
}

/// Helper type for Results that use DiffError
pub type Result<T> = std::result::Result<T, DiffError>;
