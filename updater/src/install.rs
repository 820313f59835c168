//! Placing an extracted source root at its vendored destination.
//!
//! The `mozjs` target replaces the destination wholesale. The `mozjs-sys`
//! target merges into it with `rsync`, driven by a filter file that decides
//! which parts of the engine tree are kept; files excluded by the filters are
//! deleted from the destination and empty directories are pruned.

use crate::archive::{ExtractedRoot, utf8};
use crate::error::{Result, UpdaterError};
use crate::interrupt;
use crate::runner::{CommandRunner, Invocation, run_checked};
use camino::Utf8Path;
use log::{debug, trace};
use std::fs;
use std::sync::atomic::AtomicBool;
use walkdir::WalkDir;

/// Deletes `destination` if it exists and copies the extracted root into it.
///
/// Symbolic links are recreated as links on Unix and copied as files
/// elsewhere.
///
/// # Errors
///
/// Returns an error if the old tree cannot be removed or the copy fails.
pub fn replace_destination(root: &ExtractedRoot, destination: &Utf8Path) -> Result<()> {
    if destination.exists() {
        debug!("removing previous tree at {destination}");
        fs::remove_dir_all(destination)
            .map_err(UpdaterError::filesystem("remove", destination))?;
    }
    copy_tree(root.path(), destination, interrupt::flag())
}

/// Synchronises the extracted root into `destination` with `rsync`, applying
/// the merge rules in `filter_file`.
///
/// `destination` and `filter_file` are relative to `repo_root`, which is also
/// the working directory of the `rsync` process.
///
/// # Errors
///
/// Returns an error if `rsync` is missing or fails.
pub fn merge_into_destination(
    runner: &dyn CommandRunner,
    root: &ExtractedRoot,
    repo_root: &Utf8Path,
    destination: &Utf8Path,
    filter_file: &Utf8Path,
) -> Result<()> {
    let invocation = Invocation::new("rsync")
        .args([
            "--delete-excluded".to_owned(),
            format!("--filter=merge {filter_file}"),
            "--prune-empty-dirs".to_owned(),
            "--quiet".to_owned(),
            "--recursive".to_owned(),
            format!("{}/", root.path()),
            format!("{destination}/"),
        ])
        .current_dir(repo_root);
    run_checked(runner, &invocation).map(drop)
}

/// Copies `source` to `destination`, stopping between entries once
/// `interrupted` is raised.
fn copy_tree(source: &Utf8Path, destination: &Utf8Path, interrupted: &AtomicBool) -> Result<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        interrupt::check_flag(interrupted)?;
        let entry = entry?;
        let path = utf8(entry.path())?;
        let relative = path.strip_prefix(source).unwrap_or(path);
        let target = destination.join(relative);
        trace!("copying {relative}");

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(UpdaterError::filesystem("create", &target))?;
        } else if file_type.is_symlink() {
            copy_symlink(path, &target).map_err(UpdaterError::filesystem("copy link to", &target))?;
        } else {
            fs::copy(path, &target).map_err(UpdaterError::filesystem("copy to", &target))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Utf8Path, target: &Utf8Path) -> std::io::Result<()> {
    let points_to = fs::read_link(link)?;
    std::os::unix::fs::symlink(points_to, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Utf8Path, target: &Utf8Path) -> std::io::Result<()> {
    fs::copy(link, target).map(drop)
}
