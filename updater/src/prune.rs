//! Removal of the third-party Rust crates vendored inside the engine tree.

use crate::archive::utf8;
use crate::error::Result;
use crate::git::Git;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use walkdir::WalkDir;

/// Lists the directories directly below `cache_dir`, in file name order.
///
/// Paths are relative to `repo_root`. Nested directories are not listed:
/// removing a directory removes everything below it. A missing `cache_dir`
/// yields an empty list.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or a path is not UTF-8.
pub fn find_pruned_dirs(repo_root: &Utf8Path, cache_dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let start = repo_root.join(cache_dir);
    if !start.is_dir() {
        debug!("nothing to prune, {cache_dir} does not exist");
        return Ok(Vec::new());
    }

    let mut dirs = Vec::new();
    for entry in WalkDir::new(&start)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_dir() {
            let path = utf8(entry.path())?;
            dirs.push(path.strip_prefix(repo_root).unwrap_or(path).to_owned());
        }
    }
    Ok(dirs)
}

/// Removes every crate directory below `cache_dir` with `git rm -rf`.
///
/// Returns the removed directories. The removals are staged but not
/// committed.
///
/// # Errors
///
/// Returns an error if listing fails or any removal fails.
pub fn prune_vendored_crates(git: &Git<'_>, cache_dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let dirs = find_pruned_dirs(git.repo_root(), cache_dir)?;
    for dir in &dirs {
        git.rm_recursive(dir)?;
    }
    Ok(dirs)
}
