//! Local patches applied on top of the vendored engine.
//!
//! Patches live as `*.patch` files in one directory and are applied in file
//! name order, so a later patch may build on an earlier one. Name them with a
//! numeric prefix (`01-fix.patch`, `02-extra.patch`) to control the order.

use crate::error::{Result, UpdaterError};
use crate::git::{ApplyMode, ApplyOutcome, Git};
use crate::output::Progress;
use camino::{Utf8Path, Utf8PathBuf};

/// Extension of the files collected into a [`PatchSet`].
pub const PATCH_EXTENSION: &str = "patch";

/// The ordered patches found in a patch directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSet {
    patches: Vec<Utf8PathBuf>,
}

impl PatchSet {
    /// Collects every `*.patch` file directly inside `dir`, sorted by path.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::Filesystem`] naming `dir` if it cannot be read.
    pub fn discover(dir: &Utf8Path) -> Result<Self> {
        let mut patches = Vec::new();
        let read_error = || UpdaterError::filesystem("read patch directory", dir);
        for entry in dir.read_dir_utf8().map_err(read_error())? {
            let entry = entry.map_err(read_error())?;
            let path = entry.path();
            if path.extension() == Some(PATCH_EXTENSION)
                && entry.file_type().map_err(read_error())?.is_file()
            {
                patches.push(path.to_owned());
            }
        }
        patches.sort();
        Ok(Self { patches })
    }

    /// The patches in application order.
    #[must_use]
    pub fn as_slice(&self) -> &[Utf8PathBuf] {
        &self.patches
    }

    /// Number of patches in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// Returns true when the directory held no patches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

/// What happened to each patch of a [`PatchSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Patches that applied cleanly.
    pub applied: Vec<Utf8PathBuf>,
    /// Patches that left `.rej` files behind.
    pub partially_applied: Vec<Utf8PathBuf>,
}

/// Applies every patch of `set` in order.
///
/// # Errors
///
/// Stops at the first patch git cannot process and returns its error. Under
/// [`ApplyMode::Rejecting`], rejected hunks are not an error.
pub fn apply_patches(
    git: &Git<'_>,
    set: &PatchSet,
    mode: &ApplyMode<'_>,
    progress: &mut Progress<'_>,
) -> Result<PatchReport> {
    let mut report = PatchReport::default();
    for patch in set.as_slice() {
        progress.line(format!("  Applying patch: {patch}."));
        match git.apply(patch, mode)? {
            ApplyOutcome::Clean => report.applied.push(patch.clone()),
            ApplyOutcome::WithRejects => report.partially_applied.push(patch.clone()),
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ExpectedCall, StubRunner, failure_output};
    use std::fs;

    fn patch_dir(names: &[&str]) -> (tempfile::TempDir, Utf8PathBuf) {
        let temp = tempfile::tempdir().expect("temp dir");
        let dir = Utf8PathBuf::try_from(temp.path().to_owned()).expect("utf-8");
        for name in names {
            fs::write(dir.join(name), "").expect("write patch");
        }
        (temp, dir)
    }

    #[test]
    fn discover_sorts_by_file_name_and_filters_extension() {
        let (_temp, dir) = patch_dir(&["02-extra.patch", "README.md", "01-fix.patch", "10-late.patch"]);
        fs::create_dir(dir.join("00-dir.patch")).expect("mkdir");

        let set = PatchSet::discover(&dir).expect("discover");
        let names: Vec<&str> = set
            .as_slice()
            .iter()
            .filter_map(|p| p.file_name())
            .collect();
        assert_eq!(names, ["01-fix.patch", "02-extra.patch", "10-late.patch"]);
    }

    #[test]
    fn discover_fails_for_missing_directory() {
        let err = PatchSet::discover(Utf8Path::new("/no/such/patches")).expect_err("missing dir");
        assert!(matches!(
            err,
            UpdaterError::Filesystem { ref path, .. } if path == "/no/such/patches"
        ));
        assert_eq!(
            err.to_string(),
            "failed to read patch directory /no/such/patches"
        );
    }

    #[test]
    fn applies_in_order_and_stops_at_first_failure() {
        let (_temp, dir) = patch_dir(&["01-fix.patch", "02-broken.patch", "03-never.patch"]);
        let set = PatchSet::discover(&dir).expect("discover");

        let runner = StubRunner::new(vec![
            ExpectedCall::ok("git", ["apply", dir.join("01-fix.patch").as_str()]),
            ExpectedCall::returning(
                "git",
                ["apply", dir.join("02-broken.patch").as_str()],
                Ok(failure_output("error: patch failed")),
            ),
        ]);
        let git = Git::new(&runner, &dir);
        let mut sink = Vec::new();
        let mut progress = Progress::new(&mut sink, false);

        let err = apply_patches(&git, &set, &ApplyMode::Strict, &mut progress)
            .expect_err("second patch fails");
        assert!(matches!(err, UpdaterError::CommandFailed { .. }));
        runner.assert_finished();

        let printed = String::from_utf8(sink).expect("utf-8");
        assert!(printed.contains("01-fix.patch"));
        assert!(!printed.contains("03-never.patch"));
    }

    #[test]
    fn rejecting_mode_records_partial_application() {
        let (_temp, dir) = patch_dir(&["01-fix.patch", "02-extra.patch"]);
        let set = PatchSet::discover(&dir).expect("discover");
        let first = dir.join("01-fix.patch");
        let second = dir.join("02-extra.patch");

        let runner = StubRunner::new(vec![
            ExpectedCall::returning(
                "git",
                ["apply", "--reject", "--directory=mozjs-sys/mozjs", first.as_str()],
                Ok(failure_output("Rejected hunk #1.")),
            ),
            ExpectedCall::ok(
                "git",
                ["apply", "--reject", "--directory=mozjs-sys/mozjs", second.as_str()],
            ),
        ]);
        let git = Git::new(&runner, &dir);
        let mut sink = Vec::new();
        let mut progress = Progress::new(&mut sink, true);

        let report = apply_patches(
            &git,
            &set,
            &ApplyMode::Rejecting {
                directory: Utf8Path::new("mozjs-sys/mozjs"),
            },
            &mut progress,
        )
        .expect("rejects are tolerated");

        assert_eq!(report.partially_applied, vec![first]);
        assert_eq!(report.applied, vec![second]);
        assert!(sink.is_empty(), "quiet progress prints nothing");
    }
}
