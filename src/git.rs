//! Git command builders for the pipeline.

use std::path::{Path, PathBuf};

use crate::process::CommandSpec;

/// Identity passed via `-c` flags so commits work without any git config.
#[derive(Debug, Clone)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

impl Default for CommitIdentity {
    fn default() -> Self {
        Self {
            name: "decomp-diff".to_string(),
            email: "decomp-diff@localhost".to_string(),
        }
    }
}

fn git(cwd: &Path) -> CommandSpec {
    CommandSpec::new("git", cwd)
}

/// `url` comes from the push payload; `--` keeps it from being read as an option.
pub fn clone(url: &str, dest: &str, cwd: &Path) -> CommandSpec {
    git(cwd).args(["clone", "--", url, dest])
}

pub fn checkout(rev: &str, cwd: &Path) -> CommandSpec {
    git(cwd).args(["checkout", rev])
}

/// Prints the parent commit ids of `rev` on one line, and nothing else.
pub fn show_parents(rev: &str, cwd: &Path, out: impl Into<PathBuf>) -> CommandSpec {
    git(cwd)
        .args(["show", "-s", "--format=%P", rev])
        .stdout_to(out)
}

pub fn init(cwd: &Path) -> CommandSpec {
    git(cwd).arg("init").quiet()
}

pub fn add_all(cwd: &Path) -> CommandSpec {
    git(cwd).args(["add", "."]).quiet()
}

pub fn commit(message: &str, identity: &CommitIdentity, cwd: &Path) -> CommandSpec {
    git(cwd)
        .arg("-c")
        .arg(format!("user.name={}", identity.name))
        .arg("-c")
        .arg(format!("user.email={}", identity.email))
        .args(["-c", "commit.gpgsign=false", "commit", "-q", "-m", message])
}

pub fn diff_head(cwd: &Path, out: impl Into<PathBuf>) -> CommandSpec {
    git(cwd).args(["diff", "--no-color", "HEAD"]).stdout_to(out)
}

/// First parent from `git show -s --format=%P` output.
///
/// Merge commits list several space-separated parents; the first is the one
/// the branch was on. A root commit prints an empty line and yields `None`.
pub fn first_parent(parents_output: &str) -> Option<&str> {
    parents_output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.split_whitespace().next())
}

/// Abbreviated or full hexadecimal commit id.
pub fn is_commit_id(s: &str) -> bool {
    (4..=64).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_hexdigit())
}
