pub mod api;
pub mod artifact;
pub mod decompile;
pub mod error;
pub mod git;
pub mod logging;
pub mod manifest;
pub mod notify;
pub mod pipeline;
pub mod process;
pub mod queue;
pub mod signature;
pub mod task;
pub mod webhook;
pub mod worker;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_utils;

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{DiffError, Result};
use crate::queue::TaskSender;

/// Environment variable that overrides `secret` from the config file.
pub const SECRET_ENV_VAR: &str = "DIFF_SECRET";

/// Download manifest, one artifact URL per line, inside `work_dir`.
pub const MANIFEST_FILE_NAME: &str = "dlmanifest.txt";

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_BIND_HOST: &str = "127.0.0.1";

#[derive(Debug, Deserialize, Clone)]
pub struct DiffConfig {
    /// Shared secret for `X-Hub-Signature-256` validation
    #[serde(default)]
    pub secret: String,
    /// Directory the `<after>.diff` files are written to
    pub diff_dir: PathBuf,
    /// Public URL prefix under which `diff_dir` is served
    pub diff_url: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    /// Holds the manifest, the `input/` cache and the `scratch/` workspace
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub decompiler: DecompilerConfig,
    #[serde(default)]
    pub build: BuildConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
    pub avatar_url: Option<String>,
    pub username: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            avatar_url: None,
            username: "Diff machine".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DecompilerConfig {
    pub java_bin: String,
    pub java_mem: String,
    pub driver_jar: PathBuf,
    pub main_class: String,
}

impl Default for DecompilerConfig {
    fn default() -> Self {
        Self {
            java_bin: "java".to_string(),
            java_mem: "3000M".to_string(),
            driver_jar: PathBuf::from("jardecomp.jar"),
            main_class: "org.vineflower.jardecomp.Main".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BuildConfig {
    /// Commands run in the checkout before every build
    pub prepare: Vec<Vec<String>>,
    pub command: Vec<String>,
    /// Build output directory, relative to the checkout
    pub output_dir: PathBuf,
    pub artifact_extension: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            prepare: vec![vec![
                "chmod".to_string(),
                "+x".to_string(),
                "gradlew".to_string(),
            ]],
            command: ["./gradlew", "build", "-x", "test"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_dir: PathBuf::from("build/libs"),
            artifact_extension: "jar".to_string(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind_host() -> String {
    DEFAULT_BIND_HOST.to_string()
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

impl DiffConfig {
    /// Parse a config from TOML text. Does not apply env overrides or validate.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Returns an error naming the first mandatory setting that is absent.
    pub fn validate(&self) -> Result<()> {
        if self.secret.is_empty() {
            return Err(DiffError::ConfigError(format!(
                "missing webhook secret (set `secret` or {})",
                SECRET_ENV_VAR
            )));
        }
        if self.diff_url.is_empty() {
            return Err(DiffError::ConfigError("`diff_url` is empty".to_string()));
        }
        if self.diff_dir.as_os_str().is_empty() {
            return Err(DiffError::ConfigError("`diff_dir` is empty".to_string()));
        }
        if self.build.command.is_empty() {
            return Err(DiffError::ConfigError(
                "`build.command` is empty".to_string(),
            ));
        }
        if self.build.prepare.iter().any(|cmd| cmd.is_empty()) {
            return Err(DiffError::ConfigError(
                "`build.prepare` contains an empty command".to_string(),
            ));
        }
        Ok(())
    }

    /// The driver reads this exact name from its working directory.
    pub fn manifest_path(&self) -> PathBuf {
        self.work_dir.join(MANIFEST_FILE_NAME)
    }

    pub fn input_dir(&self) -> PathBuf {
        self.work_dir.join("input")
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.work_dir.join("scratch")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

/// Load, resolve and validate the configuration file at `path`.
pub fn load_config(path: impl AsRef<Path>) -> Result<DiffConfig> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|e| {
        DiffError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let mut config = DiffConfig::from_toml(&config_str).map_err(|e| {
        DiffError::ConfigError(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    if let Ok(secret) = std::env::var(SECRET_ENV_VAR) {
        if !secret.is_empty() {
            config.secret = secret;
        }
    }

    config.work_dir = std::path::absolute(&config.work_dir).map_err(|e| {
        DiffError::ConfigError(format!(
            "Cannot resolve work_dir '{}': {}",
            config.work_dir.display(),
            e
        ))
    })?;

    config.validate()?;
    Ok(config)
}

pub struct AppState {
    pub secret: String,
    pub tasks: TaskSender,
}

impl AppState {
    pub fn new(secret: impl Into<String>, tasks: TaskSender) -> Self {
        Self {
            secret: secret.into(),
            tasks,
        }
    }
}

pub type SharedState = Arc<AppState>;
