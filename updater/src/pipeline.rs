//! Sequencing of the update steps.
//!
//! A run always proceeds extract → strip and prune → patch → configure, each
//! step gated by the [`RunPlan`], whatever order the flags were given in. The
//! first failing step ends the run and leaves the tree as far as it got; there
//! is no rollback, rerun with the completed phases switched off instead.

use crate::archive::extract_single_root;
use crate::cli::CommonArgs;
use crate::config::{ExtractStyle, PatchStyle, VendorTarget, resolve_target};
use crate::configure::generate_configure;
use crate::error::{Result, UpdaterError};
use crate::git::{ApplyMode, Git};
use crate::install::{merge_into_destination, replace_destination};
use crate::manifest::strip_manifests;
use crate::output::{DryRunInfo, Progress, write_stderr_line};
use crate::patches::{PatchReport, PatchSet, apply_patches};
use crate::prune::prune_vendored_crates;
use crate::runner::{CommandRunner, SystemCommandRunner};
use camino::{Utf8Path, Utf8PathBuf};
use log::{info, warn};
use std::io::Write;
use std::time::Duration;

/// The steps requested for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    /// Tarball to import; `None` skips extraction.
    pub tarball: Option<Utf8PathBuf>,
    /// Strip manifests, prune vendored crates and apply patches.
    pub patch: bool,
    /// Regenerate and commit the configure scripts.
    pub configure: bool,
    /// Commit the extracted tree.
    pub commit: bool,
}

impl Default for RunPlan {
    /// Every step enabled, no tarball.
    fn default() -> Self {
        Self {
            tarball: None,
            patch: true,
            configure: true,
            commit: true,
        }
    }
}

/// What a completed run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Top-level directory name of the imported tarball.
    pub extracted: Option<String>,
    /// Manifests removed from the tree.
    pub stripped: Vec<Utf8PathBuf>,
    /// Vendored crate directories removed.
    pub pruned: Vec<Utf8PathBuf>,
    /// Outcome of the patch step, if it ran.
    pub patches: Option<PatchReport>,
    /// Whether the configure scripts were regenerated.
    pub configured: bool,
}

/// Runs the update steps for one [`VendorTarget`].
pub struct Pipeline<'a> {
    runner: &'a dyn CommandRunner,
    repo_root: &'a Utf8Path,
    target: &'a VendorTarget,
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline operating on the repository at `repo_root`.
    #[must_use]
    pub fn new(
        runner: &'a dyn CommandRunner,
        repo_root: &'a Utf8Path,
        target: &'a VendorTarget,
    ) -> Self {
        Self {
            runner,
            repo_root,
            target,
        }
    }

    /// Executes the steps enabled in `plan`, in their fixed order.
    ///
    /// # Errors
    ///
    /// Returns the error of the first step that fails.
    pub fn run(&self, plan: &RunPlan, progress: &mut Progress<'_>) -> Result<RunSummary> {
        let git = Git::new(self.runner, self.repo_root);
        let mut summary = RunSummary::default();

        if let Some(tarball) = &plan.tarball {
            progress.line("Extracting tarball.");
            summary.extracted = Some(self.extract(&git, tarball, plan.commit)?);
        }

        if plan.patch {
            if !self.target.strip_roots.is_empty() {
                progress.line("Removing all Cargo.toml files.");
                summary.stripped =
                    strip_manifests(&git, &self.target.strip_roots, &self.target.strip_exclusions)?;
            }
            if let Some(cache_dir) = &self.target.pruned_dir {
                progress.line("Removing all third-party vendored Rust code.");
                summary.pruned = prune_vendored_crates(&git, cache_dir)?;
            }
            progress.line("Applying patches.");
            summary.patches = Some(self.patch(&git, progress)?);
        }

        if plan.configure {
            if let Some(configure_dir) = &self.target.configure_dir {
                progress.line("Generating configure.");
                generate_configure(
                    self.runner,
                    &git,
                    configure_dir,
                    &self.target.autoconf_candidates,
                    &self.target.configure_commit_message,
                )?;
                summary.configured = true;
            }
        }

        Ok(summary)
    }

    fn extract(&self, git: &Git<'_>, tarball: &Utf8Path, commit: bool) -> Result<String> {
        let root = extract_single_root(self.runner, tarball)?;
        let name = root.name().to_owned();
        let destination = &self.target.destination;

        match &self.target.extract_style {
            ExtractStyle::Replace => {
                replace_destination(&root, &self.repo_root.join(destination))?;
            }
            ExtractStyle::Merge { filter_file } => {
                merge_into_destination(self.runner, &root, self.repo_root, destination, filter_file)?;
            }
        }
        drop(root);
        info!("imported {name} into {destination}");

        if commit {
            git.add_all(destination)?;
            git.commit(&self.target.extract_commit_message)?;
        }
        Ok(name)
    }

    fn patch(&self, git: &Git<'_>, progress: &mut Progress<'_>) -> Result<PatchReport> {
        let set = PatchSet::discover(&self.repo_root.join(&self.target.patch_dir))?;
        info!("{} patch(es) in {}", set.len(), self.target.patch_dir);

        let mode = match self.target.patch_style {
            PatchStyle::Strict => ApplyMode::Strict,
            PatchStyle::Rejecting => ApplyMode::Rejecting {
                directory: &self.target.destination,
            },
        };
        apply_patches(git, &set, &mode, progress)
    }
}

/// Entry point shared by the update binaries.
///
/// Resolves the repository root and tarball against the working directory,
/// applies configuration overrides to `base`, then either prints the dry-run
/// report or runs the pipeline with the system command runner.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or any step fails.
pub fn run_update(
    base: VendorTarget,
    plan: RunPlan,
    common: &CommonArgs,
    stderr: &mut dyn Write,
) -> Result<()> {
    let cwd = current_dir()?;
    let repo_root = common
        .repo_root
        .as_deref()
        .map_or_else(|| cwd.clone(), |dir| absolutize(&cwd, dir));
    let plan = RunPlan {
        tarball: plan.tarball.as_deref().map(|path| absolutize(&cwd, path)),
        ..plan
    };
    let config = common.config.as_deref().map(|path| absolutize(&cwd, path));
    let target = resolve_target(base, &repo_root, config.as_deref())?;

    if common.dry_run {
        let info = DryRunInfo {
            repo_root: &repo_root,
            target: &target,
            plan: &plan,
        };
        write_stderr_line(stderr, info.display_text());
        return Ok(());
    }

    let runner = common.timeout.map_or_else(SystemCommandRunner::new, |secs| {
        SystemCommandRunner::with_timeout(Duration::from_secs(secs))
    });
    let mut progress = Progress::new(stderr, common.quiet);
    let summary = Pipeline::new(&runner, &repo_root, &target).run(&plan, &mut progress)?;
    report(&summary, &mut progress);
    Ok(())
}

fn report(summary: &RunSummary, progress: &mut Progress<'_>) {
    if !summary.stripped.is_empty() {
        info!("removed {} manifest(s)", summary.stripped.len());
    }
    if !summary.pruned.is_empty() {
        info!("removed {} vendored crate(s)", summary.pruned.len());
    }
    if let Some(report) = &summary.patches {
        info!("applied {} patch(es)", report.applied.len());
        if !report.partially_applied.is_empty() {
            warn!("{} patch(es) left rejected hunks", report.partially_applied.len());
            progress.line("Patches with rejected hunks (see the .rej files):");
            for patch in &report.partially_applied {
                progress.line(format!("  {patch}"));
            }
        }
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir()?;
    Utf8PathBuf::try_from(cwd).map_err(|err| UpdaterError::NonUtf8Path {
        path: err.into_path_buf().display().to_string(),
    })
}

fn absolutize(cwd: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_owned()
    } else {
        cwd.join(path)
    }
}
