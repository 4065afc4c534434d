//! Shared fakes for unit tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::DiffConfig;
use crate::error::{DiffError, Result};
use crate::manifest::Manifest;
use crate::notify::{Notification, Notify};
use crate::process::{CommandOutput, CommandRunner, CommandSpec, OutputMode};
use crate::task::Task;
use crate::webhook::PushEvent;

pub const TEST_SECRET: &str = "test-secret";

/// Config rooted at `work_dir`, with a one-entry manifest written there.
pub fn test_config(work_dir: &Path) -> DiffConfig {
    let text = format!(
        "secret = \"{}\"\n\
         diff_dir = \"{}\"\n\
         diff_url = \"https://diffs.example.org/\"\n\
         work_dir = \"{}\"\n",
        TEST_SECRET,
        work_dir.join("diffs").display(),
        work_dir.display()
    );
    let config = DiffConfig::from_toml(&text).unwrap();
    std::fs::write(
        config.manifest_path(),
        "https://repo.example.org/libs/dep-1.0.jar\n",
    )
    .unwrap();
    config
}

pub fn push_event(before: &str, after: &str) -> PushEvent {
    PushEvent {
        before: before.to_string(),
        after: after.to_string(),
        clone_url: "https://example.org/acme/engine.git".to_string(),
        html_url: "https://example.org/acme/engine".to_string(),
    }
}

pub fn push_task(before: &str, after: &str) -> Task {
    Task::new(push_event(before, after))
}

#[derive(Default)]
struct FakeState {
    commands: Vec<CommandSpec>,
    fail_on: Option<String>,
    parents: String,
    skip_outputs: Vec<String>,
    skip_build_output: bool,
    builds: usize,
}

/// Records commands and imitates the file effects of git, the build tool
/// and the decompile driver.
#[derive(Clone)]
pub struct FakeRunner {
    build_program: String,
    build_output: PathBuf,
    java_bin: String,
    manifest_path: PathBuf,
    output_root: PathBuf,
    state: Arc<Mutex<FakeState>>,
}

impl FakeRunner {
    pub fn new(config: &DiffConfig) -> Self {
        Self {
            build_program: config.build.command[0].clone(),
            build_output: config.build.output_dir.clone(),
            java_bin: config.decompiler.java_bin.clone(),
            manifest_path: config.manifest_path(),
            output_root: config.scratch_dir().join("output"),
            state: Arc::default(),
        }
    }

    /// Fail every command whose rendering contains `pattern`.
    pub fn fail_on(&self, pattern: &str) {
        self.state.lock().unwrap().fail_on = Some(pattern.to_string());
    }

    pub fn clear_failure(&self) {
        self.state.lock().unwrap().fail_on = None;
    }

    /// What `git show --format=%P` prints.
    pub fn set_parents(&self, parents: &str) {
        self.state.lock().unwrap().parents = parents.to_string();
    }

    pub fn skip_decompile_output(&self, short_name: &str) {
        self.state
            .lock()
            .unwrap()
            .skip_outputs
            .push(short_name.to_string());
    }

    pub fn skip_build_output(&self) {
        self.state.lock().unwrap().skip_build_output = true;
    }

    pub fn commands(&self) -> Vec<CommandSpec> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn commands_matching(&self, pattern: &str) -> Vec<String> {
        self.commands()
            .iter()
            .map(|c| c.to_string())
            .filter(|c| c.contains(pattern))
            .collect()
    }

    fn simulate(&self, command: &CommandSpec) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let args: Vec<&str> = command.args.iter().map(String::as_str).collect();

        if let OutputMode::File(path) = &command.output {
            let contents = if args.contains(&"show") {
                format!("{}\n", state.parents)
            } else {
                format!(
                    "diff --git a/Main.java b/Main.java\n-build {}\n+build {}\n",
                    state.builds.saturating_sub(1),
                    state.builds
                )
            };
            std::fs::write(path, contents)?;
        } else if command.program == "git" && args.first() == Some(&"clone") {
            if let Some(dest) = args.last() {
                std::fs::create_dir_all(command.cwd.join(dest))?;
            }
        } else if command.program == "git" && args.first() == Some(&"init") {
            std::fs::create_dir_all(command.cwd.join(".git"))?;
        } else if command.program == self.build_program {
            state.builds += 1;
            if !state.skip_build_output {
                let libs = command.cwd.join(&self.build_output);
                std::fs::create_dir_all(&libs)?;
                std::fs::write(libs.join("engine-1.0.jar"), format!("build {}", state.builds))?;
                std::fs::write(libs.join("engine-1.0-sources.jar"), "sources")?;
            }
        } else if command.program == self.java_bin {
            let text = std::fs::read_to_string(&self.manifest_path)?;
            for entry in Manifest::parse(&text).entries() {
                if state.skip_outputs.iter().any(|s| s == entry.short_name()) {
                    continue;
                }
                let dir = self.output_root.join(entry.short_name());
                std::fs::create_dir_all(&dir)?;
                std::fs::write(dir.join("Main.java"), format!("build {}", state.builds))?;
            }
        }
        Ok(())
    }
}

impl CommandRunner for FakeRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        let failing = {
            let mut state = self.state.lock().unwrap();
            state.commands.push(command.clone());
            state
                .fail_on
                .as_ref()
                .is_some_and(|pattern| command.to_string().contains(pattern.as_str()))
        };

        if failing {
            return Ok(CommandOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: "injected failure".to_string(),
            });
        }

        self.simulate(command)?;
        Ok(CommandOutput {
            code: Some(0),
            ..CommandOutput::default()
        })
    }
}

/// Collects notifications instead of sending them.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notify for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        if self.fail {
            return Err(DiffError::IoError(std::io::Error::other(
                "notification endpoint unreachable",
            )));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
