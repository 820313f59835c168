//! Vendoring targets and their optional TOML overrides.
//!
//! A [`VendorTarget`] fixes every path an update run touches. Two presets
//! exist, one per entry point: [`VendorTarget::mozjs`] replaces the `mozjs`
//! tree and regenerates `configure`, [`VendorTarget::mozjs_sys`] merges into
//! `mozjs-sys/mozjs` through an rsync filter file. A repository may adjust a
//! preset with a TOML file; every key is optional:
//!
//! ```toml
//! destination = "mozjs"
//! patch_dir = "etc/patches"
//! strip_roots = ["mozjs/build", "mozjs/js"]
//! strip_exclusions = ["mozjs/js/src/frontend/binast"]
//! pruned_dir = "mozjs/third_party/rust"
//! configure_dir = "mozjs/js/src"
//! autoconf_candidates = ["autoconf2.13", "autoconf213"]
//! extract_commit_message = "Update SpiderMonkey"
//! configure_commit_message = "Generate configure."
//! ```
//!
//! `filter_file` is also accepted, for merge-style targets only.
//!
//! Moving `destination` carries along every preset path below the old
//! destination, so `destination = "engine"` alone turns `mozjs/js/src` into
//! `engine/js/src`. Keys given explicitly are taken as written.

use crate::error::{Result, UpdaterError};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Deserialize;
use std::fmt;

/// How an extracted tarball reaches the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractStyle {
    /// Delete the destination and copy the tree in.
    Replace,
    /// Synchronise with `rsync`, honouring a filter file.
    Merge {
        /// rsync merge-filter file, relative to the repository root.
        filter_file: Utf8PathBuf,
    },
}

impl fmt::Display for ExtractStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => f.write_str("replace"),
            Self::Merge { filter_file } => write!(f, "merge (filters: {filter_file})"),
        }
    }
}

/// How patches are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchStyle {
    /// Against the repository root; any conflict is fatal.
    Strict,
    /// Scoped to the destination; conflicting hunks go to `.rej` files.
    Rejecting,
}

/// Everything an update run needs to know about one vendored tree.
///
/// All paths are relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorTarget {
    /// Where the engine tree lives.
    pub destination: Utf8PathBuf,
    /// Directory holding the `*.patch` files.
    pub patch_dir: Utf8PathBuf,
    /// How a new tarball is installed.
    pub extract_style: ExtractStyle,
    /// How patches are applied.
    pub patch_style: PatchStyle,
    /// Directories searched for `Cargo.toml` files to remove.
    pub strip_roots: Vec<Utf8PathBuf>,
    /// Directories whose `Cargo.toml` files are kept.
    pub strip_exclusions: Vec<Utf8PathBuf>,
    /// Cache of vendored crates to delete, if any.
    pub pruned_dir: Option<Utf8PathBuf>,
    /// Directory in which `configure` is regenerated, if any.
    pub configure_dir: Option<Utf8PathBuf>,
    /// autoconf 2.13 executable names, in order of preference.
    pub autoconf_candidates: Vec<String>,
    /// Message of the commit recording a new tarball.
    pub extract_commit_message: String,
    /// Message of the commit recording regenerated configure scripts.
    pub configure_commit_message: String,
    /// Override file read when present and no `--config` is given.
    pub config_file: Utf8PathBuf,
}

fn paths(items: &[&str]) -> Vec<Utf8PathBuf> {
    items.iter().copied().map(Utf8PathBuf::from).collect()
}

fn autoconf_candidates() -> Vec<String> {
    vec!["autoconf2.13".to_owned(), "autoconf213".to_owned()]
}

impl VendorTarget {
    /// The `mozjs` tree: replaced wholesale, manifests stripped, vendored
    /// crates pruned, patches applied strictly and `configure` regenerated.
    #[must_use]
    pub fn mozjs() -> Self {
        Self {
            destination: Utf8PathBuf::from("mozjs"),
            patch_dir: Utf8PathBuf::from("etc/patches"),
            extract_style: ExtractStyle::Replace,
            patch_style: PatchStyle::Strict,
            strip_roots: paths(&["mozjs/build", "mozjs/js", "mozjs/python", "mozjs/testing"]),
            strip_exclusions: paths(&["mozjs/js/src/frontend/binast"]),
            pruned_dir: Some(Utf8PathBuf::from("mozjs/third_party/rust")),
            configure_dir: Some(Utf8PathBuf::from("mozjs/js/src")),
            autoconf_candidates: autoconf_candidates(),
            extract_commit_message: "Update SpiderMonkey".to_owned(),
            configure_commit_message: "Generate configure.".to_owned(),
            config_file: Utf8PathBuf::from("etc/vendor.toml"),
        }
    }

    /// The `mozjs-sys/mozjs` tree: merged through the rsync filter file and
    /// patched tolerantly. Nothing is stripped, pruned or regenerated.
    #[must_use]
    pub fn mozjs_sys() -> Self {
        Self {
            destination: Utf8PathBuf::from("mozjs-sys/mozjs"),
            patch_dir: Utf8PathBuf::from("mozjs-sys/etc/patches"),
            extract_style: ExtractStyle::Merge {
                filter_file: Utf8PathBuf::from("mozjs-sys/etc/filters.txt"),
            },
            patch_style: PatchStyle::Rejecting,
            strip_roots: Vec::new(),
            strip_exclusions: Vec::new(),
            pruned_dir: None,
            configure_dir: None,
            autoconf_candidates: autoconf_candidates(),
            extract_commit_message: "Update SpiderMonkey".to_owned(),
            configure_commit_message: "Generate configure.".to_owned(),
            config_file: Utf8PathBuf::from("mozjs-sys/etc/vendor.toml"),
        }
    }

    /// Applies `overrides` read from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::InvalidConfig`] when `filter_file` is given for
    /// a replace-style target or `autoconf_candidates` is empty.
    pub fn with_overrides(mut self, overrides: TargetOverrides, source: &Utf8Path) -> Result<Self> {
        let invalid = |reason: &str| UpdaterError::InvalidConfig {
            path: source.to_owned(),
            reason: reason.to_owned(),
        };

        if let Some(destination) = overrides.destination {
            self.rebase(&destination);
            self.destination = destination;
        }
        if let Some(patch_dir) = overrides.patch_dir {
            self.patch_dir = patch_dir;
        }
        if let Some(filter) = overrides.filter_file {
            match &mut self.extract_style {
                ExtractStyle::Merge { filter_file } => *filter_file = filter,
                ExtractStyle::Replace => {
                    return Err(invalid("filter_file only applies to merge-style targets"));
                }
            }
        }
        if let Some(roots) = overrides.strip_roots {
            self.strip_roots = roots;
        }
        if let Some(exclusions) = overrides.strip_exclusions {
            self.strip_exclusions = exclusions;
        }
        if let Some(dir) = overrides.pruned_dir {
            self.pruned_dir = Some(dir);
        }
        if let Some(dir) = overrides.configure_dir {
            self.configure_dir = Some(dir);
        }
        if let Some(candidates) = overrides.autoconf_candidates {
            if candidates.is_empty() {
                return Err(invalid("autoconf_candidates must not be empty"));
            }
            self.autoconf_candidates = candidates;
        }
        if let Some(message) = overrides.extract_commit_message {
            self.extract_commit_message = message;
        }
        if let Some(message) = overrides.configure_commit_message {
            self.configure_commit_message = message;
        }
        Ok(self)
    }

    /// Moves every path below the current destination under `destination`.
    fn rebase(&mut self, destination: &Utf8Path) {
        let old = self.destination.clone();
        let mut nested: Vec<&mut Utf8PathBuf> = vec![&mut self.patch_dir];
        nested.extend(&mut self.strip_roots);
        nested.extend(&mut self.strip_exclusions);
        nested.extend(&mut self.pruned_dir);
        nested.extend(&mut self.configure_dir);
        if let ExtractStyle::Merge { filter_file } = &mut self.extract_style {
            nested.push(filter_file);
        }
        for path in nested {
            if let Ok(rest) = path.strip_prefix(&old) {
                *path = destination.join(rest);
            }
        }
    }
}

/// Optional per-repository adjustments to a [`VendorTarget`].
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TargetOverrides {
    /// Replaces [`VendorTarget::destination`], moving the paths nested below it.
    pub destination: Option<Utf8PathBuf>,
    /// Replaces [`VendorTarget::patch_dir`].
    pub patch_dir: Option<Utf8PathBuf>,
    /// Replaces the filter file of a merge-style target.
    pub filter_file: Option<Utf8PathBuf>,
    /// Replaces [`VendorTarget::strip_roots`].
    pub strip_roots: Option<Vec<Utf8PathBuf>>,
    /// Replaces [`VendorTarget::strip_exclusions`].
    pub strip_exclusions: Option<Vec<Utf8PathBuf>>,
    /// Sets [`VendorTarget::pruned_dir`].
    pub pruned_dir: Option<Utf8PathBuf>,
    /// Sets [`VendorTarget::configure_dir`].
    pub configure_dir: Option<Utf8PathBuf>,
    /// Replaces [`VendorTarget::autoconf_candidates`].
    pub autoconf_candidates: Option<Vec<String>>,
    /// Replaces [`VendorTarget::extract_commit_message`].
    pub extract_commit_message: Option<String>,
    /// Replaces [`VendorTarget::configure_commit_message`].
    pub configure_commit_message: Option<String>,
}

impl TargetOverrides {
    /// Parses overrides from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::InvalidConfig`] naming `source` on parse errors
    /// and unknown keys.
    pub fn parse(text: &str, source: &Utf8Path) -> Result<Self> {
        toml::from_str(text).map_err(|err| UpdaterError::InvalidConfig {
            path: source.to_owned(),
            reason: err.message().to_owned(),
        })
    }

    /// Reads and parses the override file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::InvalidConfig`] when the file cannot be read
    /// or parsed.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| UpdaterError::InvalidConfig {
            path: path.to_owned(),
            reason: err.to_string(),
        })?;
        Self::parse(&text, path)
    }
}

/// Resolves the target for a run.
///
/// An explicit `config` path must exist. Without one, the target's own
/// [`VendorTarget::config_file`] below `repo_root` is used when present.
///
/// # Errors
///
/// Returns [`UpdaterError::InvalidConfig`] if the override file cannot be
/// used.
pub fn resolve_target(
    base: VendorTarget,
    repo_root: &Utf8Path,
    config: Option<&Utf8Path>,
) -> Result<VendorTarget> {
    let path = match config {
        Some(path) => path.to_owned(),
        None => {
            let default = repo_root.join(&base.config_file);
            if !default.is_file() {
                return Ok(base);
            }
            default
        }
    };

    debug!("loading vendor overrides from {path}");
    let overrides = TargetOverrides::load(&path)?;
    base.with_overrides(overrides, &path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn presets_differ_only_where_the_workflows_differ() {
        let mozjs = VendorTarget::mozjs();
        let sys = VendorTarget::mozjs_sys();

        assert_eq!(mozjs.extract_style, ExtractStyle::Replace);
        assert_eq!(sys.patch_style, PatchStyle::Rejecting);
        assert!(sys.strip_roots.is_empty());
        assert!(sys.configure_dir.is_none());
        assert_eq!(mozjs.autoconf_candidates, sys.autoconf_candidates);
        assert_eq!(mozjs.extract_commit_message, sys.extract_commit_message);
    }

    #[test]
    fn parses_partial_overrides() {
        let overrides = TargetOverrides::parse(
            "patch_dir = \"patches\"\nstrip_exclusions = []\n",
            Utf8Path::new("vendor.toml"),
        )
        .expect("valid config");

        let target = VendorTarget::mozjs()
            .with_overrides(overrides, Utf8Path::new("vendor.toml"))
            .expect("overrides apply");
        assert_eq!(target.patch_dir, Utf8PathBuf::from("patches"));
        assert!(target.strip_exclusions.is_empty());
        assert_eq!(target.destination, Utf8PathBuf::from("mozjs"));
    }

    #[test]
    fn moving_destination_carries_nested_paths() {
        let overrides = TargetOverrides::parse(
            "destination = \"engine\"\nconfigure_dir = \"custom/js/src\"\n",
            Utf8Path::new("vendor.toml"),
        )
        .expect("valid config");

        let target = VendorTarget::mozjs()
            .with_overrides(overrides, Utf8Path::new("vendor.toml"))
            .expect("overrides apply");
        assert_eq!(target.destination, Utf8PathBuf::from("engine"));
        assert_eq!(
            target.strip_roots,
            paths(&["engine/build", "engine/js", "engine/python", "engine/testing"])
        );
        assert_eq!(target.strip_exclusions, paths(&["engine/js/src/frontend/binast"]));
        assert_eq!(target.pruned_dir, Some(Utf8PathBuf::from("engine/third_party/rust")));
        assert_eq!(target.configure_dir, Some(Utf8PathBuf::from("custom/js/src")));
        assert_eq!(target.patch_dir, Utf8PathBuf::from("etc/patches"));
    }

    #[test]
    fn moving_merge_destination_keeps_sibling_paths() {
        let overrides = TargetOverrides {
            destination: Some(Utf8PathBuf::from("mozjs-sys/engine")),
            ..TargetOverrides::default()
        };

        let target = VendorTarget::mozjs_sys()
            .with_overrides(overrides, Utf8Path::new("vendor.toml"))
            .expect("overrides apply");
        assert_eq!(target.destination, Utf8PathBuf::from("mozjs-sys/engine"));
        assert_eq!(target.patch_dir, Utf8PathBuf::from("mozjs-sys/etc/patches"));
        assert_eq!(
            target.extract_style,
            ExtractStyle::Merge {
                filter_file: Utf8PathBuf::from("mozjs-sys/etc/filters.txt")
            }
        );
    }

    #[rstest]
    #[case::unknown_key("colour = \"blue\"\n")]
    #[case::wrong_type("strip_roots = \"mozjs/js\"\n")]
    fn rejects_invalid_files(#[case] text: &str) {
        let err = TargetOverrides::parse(text, Utf8Path::new("vendor.toml"))
            .expect_err("invalid config");
        assert!(matches!(err, UpdaterError::InvalidConfig { .. }));
    }

    #[test]
    fn filter_file_requires_merge_style() {
        let overrides = TargetOverrides {
            filter_file: Some(Utf8PathBuf::from("filters.txt")),
            ..TargetOverrides::default()
        };

        let err = VendorTarget::mozjs()
            .with_overrides(overrides.clone(), Utf8Path::new("vendor.toml"))
            .expect_err("replace style has no filters");
        assert!(err.to_string().contains("merge-style"));

        let sys = VendorTarget::mozjs_sys()
            .with_overrides(overrides, Utf8Path::new("vendor.toml"))
            .expect("merge style accepts filters");
        assert_eq!(
            sys.extract_style,
            ExtractStyle::Merge {
                filter_file: Utf8PathBuf::from("filters.txt")
            }
        );
    }

    #[test]
    fn empty_autoconf_candidates_are_rejected() {
        let overrides = TargetOverrides {
            autoconf_candidates: Some(Vec::new()),
            ..TargetOverrides::default()
        };
        let result = VendorTarget::mozjs().with_overrides(overrides, Utf8Path::new("vendor.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn resolve_uses_default_file_when_present() {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_owned()).expect("utf-8");
        std::fs::create_dir_all(root.join("etc")).expect("mkdir");
        std::fs::write(root.join("etc/vendor.toml"), "destination = \"engine\"\n").expect("write");

        let target = resolve_target(VendorTarget::mozjs(), &root, None).expect("resolve");
        assert_eq!(target.destination, Utf8PathBuf::from("engine"));
    }

    #[test]
    fn resolve_without_file_returns_preset() {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_owned()).expect("utf-8");

        let target = resolve_target(VendorTarget::mozjs_sys(), &root, None).expect("resolve");
        assert_eq!(target, VendorTarget::mozjs_sys());
    }

    #[test]
    fn resolve_fails_for_missing_explicit_file() {
        let err = resolve_target(
            VendorTarget::mozjs(),
            Utf8Path::new("/repo"),
            Some(Utf8Path::new("/no/such/vendor.toml")),
        )
        .expect_err("explicit file must exist");
        assert!(matches!(err, UpdaterError::InvalidConfig { .. }));
    }
}
