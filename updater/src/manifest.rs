//! Removal of Cargo manifests embedded in the vendored engine.
//!
//! Parts of the SpiderMonkey tree carry their own `Cargo.toml` files. Left in
//! place they would be picked up as packages of the host workspace, so they
//! are removed from version control. Directories on the exclusion list keep
//! their manifests, including everything nested below them.

use crate::archive::utf8;
use crate::error::Result;
use crate::git::Git;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};
use std::path::PathBuf;
use walkdir::WalkDir;

/// File name of the manifests that are stripped.
pub const MANIFEST_NAME: &str = "Cargo.toml";

/// Finds every manifest below `roots`, skipping the subtrees in `exclusions`.
///
/// `roots` and `exclusions` are relative to `repo_root`, and so are the
/// returned paths. Roots are visited in the given order and each one in file
/// name order. Missing roots are skipped.
///
/// # Errors
///
/// Returns an error if a directory cannot be read or a path is not UTF-8.
pub fn find_manifests(
    repo_root: &Utf8Path,
    roots: &[Utf8PathBuf],
    exclusions: &[Utf8PathBuf],
) -> Result<Vec<Utf8PathBuf>> {
    let excluded: Vec<PathBuf> = exclusions
        .iter()
        .map(|dir| repo_root.join(dir).into_std_path_buf())
        .collect();
    let mut manifests = Vec::new();

    for root in roots {
        let start = repo_root.join(root);
        if !start.is_dir() {
            debug!("skipping missing directory {root}");
            continue;
        }

        let walker = WalkDir::new(&start)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let skip = entry.file_type().is_dir() && excluded.iter().any(|dir| dir == entry.path());
                if skip {
                    trace!("not descending into excluded {}", entry.path().display());
                }
                !skip
            });

        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() && entry.file_name() == MANIFEST_NAME {
                let path = utf8(entry.path())?;
                manifests.push(path.strip_prefix(repo_root).unwrap_or(path).to_owned());
            }
        }
    }

    Ok(manifests)
}

/// Removes every manifest found by [`find_manifests`] with `git rm`.
///
/// The removals are staged but not committed. Returns the removed paths.
///
/// # Errors
///
/// Returns an error if the walk fails or any removal fails.
pub fn strip_manifests(
    git: &Git<'_>,
    roots: &[Utf8PathBuf],
    exclusions: &[Utf8PathBuf],
) -> Result<Vec<Utf8PathBuf>> {
    let manifests = find_manifests(git.repo_root(), roots, exclusions)?;
    for manifest in &manifests {
        git.rm(manifest)?;
    }
    Ok(manifests)
}
