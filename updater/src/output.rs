//! Progress and summary output for the update tools.
//!
//! Progress lines mirror the steps of a run ("Extracting tarball.",
//! "Applying patches.") and go to stderr unless `--quiet` is given. Errors are
//! always printed.

use crate::config::VendorTarget;
use crate::error::{Result, UpdaterError};
use crate::interrupt::INTERRUPTED_EXIT_CODE;
use crate::pipeline::RunPlan;
use camino::Utf8Path;
use std::io::Write;

/// Writes progress lines unless quiet.
pub struct Progress<'a> {
    out: &'a mut dyn Write,
    quiet: bool,
}

impl<'a> Progress<'a> {
    /// Creates a progress writer over `out`.
    pub fn new(out: &'a mut dyn Write, quiet: bool) -> Self {
        Self { out, quiet }
    }

    /// Writes one progress line.
    pub fn line(&mut self, message: impl std::fmt::Display) {
        if !self.quiet {
            write_stderr_line(self.out, message);
        }
    }
}

/// Writes `message` and a newline, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Prints the error of a failed run and returns the process exit code: 0 on
/// success, 130 after Ctrl-C and 1 for any other error.
pub fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {}", error_chain(&err)));
            if matches!(err, UpdaterError::Interrupted) {
                INTERRUPTED_EXIT_CODE
            } else {
                1
            }
        }
    }
}

/// Renders an error followed by its sources, separated by `: `.
///
/// Sources already spelled out in the message are not repeated.
#[must_use]
pub fn error_chain(err: &UpdaterError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// What a dry run reports.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use mozjs_updater::config::VendorTarget;
/// use mozjs_updater::output::DryRunInfo;
/// use mozjs_updater::pipeline::RunPlan;
///
/// let target = VendorTarget::mozjs();
/// let plan = RunPlan::default();
/// let info = DryRunInfo {
///     repo_root: Utf8Path::new("/src/mozjs"),
///     target: &target,
///     plan: &plan,
/// };
///
/// let output = info.display_text();
/// assert!(output.contains("Dry run"));
/// assert!(output.contains("Destination: mozjs"));
/// ```
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// Repository root all target paths are relative to.
    pub repo_root: &'a Utf8Path,
    /// Resolved vendoring target.
    pub target: &'a VendorTarget,
    /// Steps that would run.
    pub plan: &'a RunPlan,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let target = self.target;
        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Repository root: {}", self.repo_root),
            format!("Destination: {}", target.destination),
            format!("Extraction: {}", target.extract_style),
            format!(
                "Tarball: {}",
                self.plan
                    .tarball
                    .as_ref()
                    .map_or_else(|| "(none, extraction skipped)".to_owned(), ToString::to_string)
            ),
            format!("Commit extraction: {}", self.plan.commit),
            format!("Patch: {}", self.plan.patch),
        ];

        if self.plan.patch {
            lines.push(format!("Patch directory: {}", target.patch_dir));
            for root in &target.strip_roots {
                lines.push(format!("  Strip manifests below: {root}"));
            }
            for excluded in &target.strip_exclusions {
                lines.push(format!("  Keep manifests below: {excluded}"));
            }
            if let Some(dir) = &target.pruned_dir {
                lines.push(format!("  Prune vendored crates in: {dir}"));
            }
        }

        lines.push(format!(
            "Configure: {}",
            match (&target.configure_dir, self.plan.configure) {
                (Some(dir), true) => dir.to_string(),
                _ => "skipped".to_owned(),
            }
        ));

        lines.join("\n")
    }
}
