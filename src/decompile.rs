//! Decompile driver invocation.
//!
//! The driver is an external JVM program. It reads the manifest from its
//! working directory and, for every entry, writes decompiled sources for
//! `input/<file name>` into `scratch/output/<short name>/`, using the located
//! build artifact as the decompiler engine. It reports nothing structured, so
//! success is judged from the exit status and the output directories.

use std::env;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::DiffConfig;
use crate::error::{DiffError, Result};
use crate::manifest::Manifest;
use crate::process::{CommandRunner, CommandSpec, run_checked};

#[derive(Debug, Clone)]
pub struct DecompileDriver {
    java_bin: String,
    java_mem: String,
    driver_jar: PathBuf,
    main_class: String,
    work_dir: PathBuf,
    manifest_path: PathBuf,
    output_root: PathBuf,
}

impl DecompileDriver {
    pub fn new(config: &DiffConfig) -> Self {
        Self {
            java_bin: config.decompiler.java_bin.clone(),
            java_mem: config.decompiler.java_mem.clone(),
            driver_jar: config.decompiler.driver_jar.clone(),
            main_class: config.decompiler.main_class.clone(),
            work_dir: config.work_dir.clone(),
            manifest_path: config.manifest_path(),
            output_root: config.scratch_dir().join("output"),
        }
    }

    /// `<java> -Xmx<mem> -cp <driver jar><sep><artifact> <main class>`, run
    /// from the work directory.
    pub fn command(&self, artifact: &Path) -> Result<CommandSpec> {
        let classpath = env::join_paths([self.driver_jar.as_path(), artifact]).map_err(|e| {
            DiffError::ConfigError(format!(
                "Cannot build classpath from '{}' and '{}': {}",
                self.driver_jar.display(),
                artifact.display(),
                e
            ))
        })?;

        Ok(CommandSpec::new(self.java_bin.clone(), self.work_dir.clone())
            .arg(format!("-Xmx{}", self.java_mem))
            .arg("-cp")
            .arg(classpath.to_string_lossy().into_owned())
            .arg(self.main_class.clone()))
    }

    /// Run the driver against `artifact` and return the per-entry output
    /// directories it produced.
    pub async fn decompile<R: CommandRunner>(
        &self,
        runner: &R,
        artifact: &Path,
    ) -> Result<Vec<PathBuf>> {
        let manifest = Manifest::load(&self.manifest_path).await?;
        if manifest.is_empty() {
            return Err(DiffError::ManifestError(format!(
                "'{}' lists no artifacts",
                self.manifest_path.display()
            )));
        }

        info!(
            "Decompiling {} manifest entries with {}",
            manifest.entries().len(),
            artifact.display()
        );
        run_checked(runner, &self.command(artifact)?).await?;

        let mut outputs = Vec::with_capacity(manifest.entries().len());
        for entry in manifest.entries() {
            let dir = self.output_root.join(entry.short_name());
            if !has_files(&dir).await {
                return Err(DiffError::DecompileOutputMissing(
                    entry.short_name().to_string(),
                ));
            }
            outputs.push(dir);
        }
        Ok(outputs)
    }
}

async fn has_files(dir: &Path) -> bool {
    match tokio::fs::read_dir(dir).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
        Err(_) => false,
    }
}
