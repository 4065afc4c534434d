//! The per-task clone → build → decompile → diff → publish pipeline.
//!
//! A task walks the [`Stage`]s in order. The first failing stage ends the
//! run; the scratch workspace is then removed on a best-effort basis so the
//! next task starts clean. Nothing is retried.

use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, warn};

use crate::artifact::ArtifactSet;
use crate::decompile::DecompileDriver;
use crate::error::{DiffError, Result};
use crate::git::{self, CommitIdentity};
use crate::notify::{Notification, Notify};
use crate::process::{CommandRunner, CommandSpec, run_checked};
use crate::task::Task;
use crate::webhook::PushEvent;
use crate::workspace::{ScratchWorkspace, remove_tree};
use crate::{BuildConfig, DiffConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Setup,
    Clone,
    ResolveBefore,
    BuildBefore,
    LocateBefore,
    DecompileBefore,
    BuildAfter,
    LocateAfter,
    DecompileAfter,
    Diff,
    Publish,
    Teardown,
}

impl Stage {
    pub const FIRST: Stage = Stage::Setup;

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Setup => Some(Stage::Clone),
            Stage::Clone => Some(Stage::ResolveBefore),
            Stage::ResolveBefore => Some(Stage::BuildBefore),
            Stage::BuildBefore => Some(Stage::LocateBefore),
            Stage::LocateBefore => Some(Stage::DecompileBefore),
            Stage::DecompileBefore => Some(Stage::BuildAfter),
            Stage::BuildAfter => Some(Stage::LocateAfter),
            Stage::LocateAfter => Some(Stage::DecompileAfter),
            Stage::DecompileAfter => Some(Stage::Diff),
            Stage::Diff => Some(Stage::Publish),
            Stage::Publish => Some(Stage::Teardown),
            Stage::Teardown => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Setup => "setup",
            Stage::Clone => "clone",
            Stage::ResolveBefore => "resolve_before",
            Stage::BuildBefore => "build_before",
            Stage::LocateBefore => "locate_before",
            Stage::DecompileBefore => "decompile_before",
            Stage::BuildAfter => "build_after",
            Stage::LocateAfter => "locate_after",
            Stage::DecompileAfter => "decompile_after",
            Stage::Diff => "diff",
            Stage::Publish => "publish",
            Stage::Teardown => "teardown",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run that stopped at `stage`.
#[derive(Debug, thiserror::Error)]
#[error("stage {stage} failed: {source}")]
pub struct PipelineFailure {
    pub stage: Stage,
    #[source]
    pub source: DiffError,
}

/// A completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOutcome {
    /// The before-commit actually diffed against (first parent of `after`)
    pub before: String,
    pub after: String,
    pub diff_path: PathBuf,
    pub diff_url: String,
}

/// Values carried from one stage to the next.
struct RunState<'a> {
    event: &'a PushEvent,
    before: String,
    artifact: Option<PathBuf>,
    diff_path: Option<PathBuf>,
}

pub struct Pipeline<R, N> {
    runner: R,
    notifier: N,
    workspace: ScratchWorkspace,
    driver: DecompileDriver,
    build: BuildConfig,
    identity: CommitIdentity,
    diff_dir: PathBuf,
    diff_url: String,
}

impl<R: CommandRunner, N: Notify> Pipeline<R, N> {
    pub fn new(config: &DiffConfig, runner: R, notifier: N) -> Self {
        Self {
            runner,
            notifier,
            workspace: ScratchWorkspace::new(config.scratch_dir()),
            driver: DecompileDriver::new(config),
            build: config.build.clone(),
            identity: CommitIdentity::default(),
            diff_dir: config.diff_dir.clone(),
            diff_url: config.diff_url.clone(),
        }
    }

    pub fn workspace(&self) -> &ScratchWorkspace {
        &self.workspace
    }

    /// Run one task and contain any failure.
    ///
    /// Always leaves the scratch workspace removed; errors from that cleanup
    /// are logged and dropped.
    pub async fn process(&self, task: Task) -> Option<DiffOutcome> {
        info!(
            "Task {} - diffing {}..{} of {} (queued {}s)",
            task.id,
            task.event.before,
            task.event.after,
            task.event.clone_url,
            task.queued_for_secs()
        );

        match self.run(&task).await {
            Ok(outcome) => {
                info!(
                    "Task {} completed; diff published at {}",
                    task.id, outcome.diff_url
                );
                Some(outcome)
            }
            Err(failure) => {
                error!("Task {} failed: {}", task.id, failure);
                if let Err(e) = self.workspace.destroy().await {
                    error!(
                        "Task {} - could not clean scratch workspace {}: {}",
                        task.id,
                        self.workspace.root.display(),
                        e
                    );
                }
                None
            }
        }
    }

    /// Walk every stage in order, stopping at the first failure.
    pub async fn run(&self, task: &Task) -> std::result::Result<DiffOutcome, PipelineFailure> {
        let mut state = RunState {
            event: &task.event,
            before: task.event.before.clone(),
            artifact: None,
            diff_path: None,
        };

        let mut stage = Some(Stage::FIRST);
        while let Some(current) = stage {
            info!("Task {} - {}", task.id, current);
            self.step(current, &mut state)
                .await
                .map_err(|source| PipelineFailure {
                    stage: current,
                    source,
                })?;
            stage = current.next();
        }

        let diff_path = state.diff_path.ok_or_else(|| PipelineFailure {
            stage: Stage::Diff,
            source: DiffError::IoError(std::io::Error::other("diff was never written")),
        })?;
        Ok(DiffOutcome {
            diff_url: self.published_url(&task.event.after),
            before: state.before,
            after: task.event.after.clone(),
            diff_path,
        })
    }

    async fn step(&self, stage: Stage, state: &mut RunState<'_>) -> Result<()> {
        let ws = &self.workspace;
        let event = state.event;

        match stage {
            Stage::Setup => {
                for id in [&event.before, &event.after] {
                    if !git::is_commit_id(id) {
                        return Err(DiffError::InvalidCommit(id.clone()));
                    }
                }
                ws.reset().await?;
            }
            Stage::Clone => {
                self.exec(git::clone(
                    &event.clone_url,
                    ScratchWorkspace::REPO_DIR_NAME,
                    &ws.root,
                ))
                .await?;
            }
            Stage::ResolveBefore => {
                self.exec(git::checkout(&event.after, &ws.repo_dir)).await?;
                self.exec(git::show_parents(
                    &event.after,
                    &ws.repo_dir,
                    &ws.last_commit_file,
                ))
                .await?;

                let parents = fs::read_to_string(&ws.last_commit_file).await?;
                match git::first_parent(&parents) {
                    Some(actual) if actual != state.before => {
                        if !git::is_commit_id(actual) {
                            return Err(DiffError::InvalidCommit(actual.to_string()));
                        }
                        info!(
                            "Before commit purported to be {} but is actually {}",
                            state.before, actual
                        );
                        state.before = actual.to_string();
                    }
                    Some(_) => {}
                    None => warn!(
                        "{} has no parent; keeping {} as the before commit",
                        event.after, state.before
                    ),
                }
            }
            Stage::BuildBefore => {
                self.exec(git::checkout(&state.before, &ws.repo_dir)).await?;
                self.build().await?;
            }
            Stage::LocateBefore | Stage::LocateAfter => {
                let artifacts =
                    ArtifactSet::locate(&self.build_output_dir(), &self.build.artifact_extension)?;
                let artifact = artifacts.primary()?.to_path_buf();
                info!("Using build artifact {}", artifact.display());
                state.artifact = Some(artifact);
            }
            Stage::DecompileBefore => {
                if !ws.output_dir.join(".git").exists() {
                    self.exec(git::init(&ws.output_dir)).await?;
                }
                self.decompile(state).await?;
                self.exec(git::add_all(&ws.output_dir)).await?;
                self.exec(git::commit(
                    &format!("before {}", state.before),
                    &self.identity,
                    &ws.output_dir,
                ))
                .await?;
            }
            Stage::BuildAfter => {
                remove_tree(&self.build_output_dir()).await?;
                state.artifact = None;
                self.exec(git::checkout(&event.after, &ws.repo_dir)).await?;
                self.build().await?;
            }
            Stage::DecompileAfter => {
                self.decompile(state).await?;
            }
            Stage::Diff => {
                self.exec(git::add_all(&ws.output_dir)).await?;
                self.exec(git::diff_head(&ws.output_dir, &ws.diff_file)).await?;

                fs::create_dir_all(&self.diff_dir).await?;
                let target = self.diff_dir.join(diff_file_name(&event.after));
                fs::copy(&ws.diff_file, &target).await?;
                info!("Wrote {}", target.display());
                state.diff_path = Some(target);
            }
            Stage::Publish => {
                self.notifier
                    .notify(&Notification {
                        after: event.after.clone(),
                        html_url: event.html_url.clone(),
                        diff_url: self.published_url(&event.after),
                    })
                    .await?;
            }
            Stage::Teardown => {
                ws.destroy().await?;
            }
        }
        Ok(())
    }

    async fn exec(&self, command: CommandSpec) -> Result<()> {
        run_checked(&self.runner, &command).await.map(|_| ())
    }

    async fn build(&self) -> Result<()> {
        let repo = &self.workspace.repo_dir;
        for argv in &self.build.prepare {
            if let Some(command) = CommandSpec::from_argv(argv, repo) {
                self.exec(command).await?;
            }
        }
        let command = CommandSpec::from_argv(&self.build.command, repo)
            .ok_or_else(|| DiffError::ConfigError("`build.command` is empty".to_string()))?;
        self.exec(command).await
    }

    async fn decompile(&self, state: &RunState<'_>) -> Result<()> {
        let artifact = state
            .artifact
            .as_deref()
            .ok_or_else(|| DiffError::ArtifactNotFound(self.build_output_dir()))?;
        self.driver.decompile(&self.runner, artifact).await?;
        Ok(())
    }

    fn build_output_dir(&self) -> PathBuf {
        self.workspace.repo_dir.join(&self.build.output_dir)
    }

    fn published_url(&self, after: &str) -> String {
        format!("{}{}", self.diff_url, diff_file_name(after))
    }
}

pub fn diff_file_name(after: &str) -> String {
    format!("{}.diff", after)
}

/// Where the diff for `after` lands inside `diff_dir`.
pub fn diff_path(diff_dir: &Path, after: &str) -> PathBuf {
    diff_dir.join(diff_file_name(after))
}
