//! Version-control operations performed by the update steps.
//!
//! Staging, removals and commits are a deliberate part of an update run: the
//! extracted tree, the stripped manifests and the regenerated configure
//! scripts all end up in git history. Every command runs from the repository
//! root with paths relative to it and with stdout discarded.

use crate::error::Result;
use crate::runner::{CommandRunner, Invocation, StdoutMode, command_failed, run_checked};
use camino::Utf8Path;
use log::warn;

/// Handle for running git commands in one repository.
pub struct Git<'a> {
    runner: &'a dyn CommandRunner,
    repo_root: &'a Utf8Path,
}

/// How `git apply` treats hunks that do not apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyMode<'a> {
    /// Fail the whole patch on any conflict.
    Strict,
    /// Apply what applies under `directory` and write the rest to `.rej`
    /// files.
    Rejecting {
        /// Directory prepended to every path in the patch.
        directory: &'a Utf8Path,
    },
}

/// Result of a successful `git apply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Every hunk applied.
    Clean,
    /// Some hunks were written to reject files.
    WithRejects,
}

impl<'a> Git<'a> {
    /// Creates a handle for the repository rooted at `repo_root`.
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, repo_root: &'a Utf8Path) -> Self {
        Self { runner, repo_root }
    }

    /// The repository root all paths are relative to.
    #[must_use]
    pub fn repo_root(&self) -> &Utf8Path {
        self.repo_root
    }

    /// Stages every change (additions, modifications, deletions) under `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if git fails.
    pub fn add_all(&self, path: &Utf8Path) -> Result<()> {
        self.run(["add", "--all", path.as_str()])
    }

    /// Stages `path` even if it is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if git fails.
    pub fn add_force(&self, path: &Utf8Path) -> Result<()> {
        self.run(["add", "-f", path.as_str()])
    }

    /// Commits the index with `message`.
    ///
    /// # Errors
    ///
    /// Returns an error if git fails, including when there is nothing to
    /// commit.
    pub fn commit(&self, message: &str) -> Result<()> {
        self.run(["commit", "-m", message])
    }

    /// Removes a tracked file from the index and the working tree.
    ///
    /// # Errors
    ///
    /// Returns an error if git fails.
    pub fn rm(&self, path: &Utf8Path) -> Result<()> {
        self.run(["rm", path.as_str()])
    }

    /// Removes a directory recursively, ignoring local modifications.
    ///
    /// # Errors
    ///
    /// Returns an error if git fails.
    pub fn rm_recursive(&self, path: &Utf8Path) -> Result<()> {
        self.run(["rm", "-rf", path.as_str()])
    }

    /// Applies the patch at `patch` to the working tree.
    ///
    /// In [`ApplyMode::Rejecting`] a run that only failed because some hunks
    /// were rejected is reported as [`ApplyOutcome::WithRejects`]; any other
    /// failure is an error. git runs in the C locale so that its report can
    /// be read whatever the user's language.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::UpdaterError::CommandFailed`] when git cannot
    /// process the patch.
    pub fn apply(&self, patch: &Utf8Path, mode: &ApplyMode<'_>) -> Result<ApplyOutcome> {
        let invocation = match mode {
            ApplyMode::Strict => self.invocation(["apply", patch.as_str()]),
            ApplyMode::Rejecting { directory } => self.invocation([
                "apply".to_owned(),
                "--reject".to_owned(),
                format!("--directory={directory}"),
                patch.to_string(),
            ]),
        }
        .env("LC_ALL", "C");

        let output = self.runner.run(&invocation)?;
        if output.status.success() {
            return Ok(ApplyOutcome::Clean);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if matches!(mode, ApplyMode::Rejecting { .. }) && reports_rejected_hunks(&stderr) {
            warn!("{patch} applied with rejected hunks");
            return Ok(ApplyOutcome::WithRejects);
        }

        Err(command_failed(&invocation, &output))
    }

    fn invocation<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new("git")
            .args(args)
            .current_dir(self.repo_root)
            .stdout(StdoutMode::Null)
    }

    fn run<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        run_checked(self.runner, &self.invocation(args)).map(drop)
    }
}

/// Returns true when `git apply --reject` output shows that the patch was
/// processed but some hunks were written to reject files.
fn reports_rejected_hunks(stderr: &str) -> bool {
    stderr.lines().any(|line| {
        line.starts_with("Rejected hunk") || (line.starts_with("Applying patch") && line.contains(" reject"))
    })
}
