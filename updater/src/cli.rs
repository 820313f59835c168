//! CLI argument definitions for the update tools.
//!
//! Each binary gets its own parser; the flags every update tool understands
//! live in [`CommonArgs`] and are flattened into both.

use crate::pipeline::RunPlan;
use camino::Utf8PathBuf;
use clap::{ArgAction, Args, Parser};

/// Import a SpiderMonkey release into `mozjs/`.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "mozjs-update")]
#[command(version, about)]
#[command(long_about = concat!(
    "Import a SpiderMonkey release into mozjs/.\n\n",
    "The tarball's single top-level directory replaces mozjs/ wholesale and the ",
    "result is committed. Cargo.toml files inside the engine tree and the ",
    "third-party crates vendored under mozjs/third_party/rust are then removed, ",
    "the patches in etc/patches are applied in file name order, and configure ",
    "is regenerated with autoconf 2.13 and committed.\n\n",
    "Without a tarball, extraction is skipped and the remaining steps run on ",
    "the tree as it is.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Import a release and run every step:\n",
    "    $ mozjs-update mozjs-52.9.1.tar.bz2\n\n",
    "  Re-apply the patches and regenerate configure only:\n",
    "    $ mozjs-update\n\n",
    "  Import without touching patches or configure:\n",
    "    $ mozjs-update --no-patch --no-configure mozjs-52.9.1.tar.bz2\n\n",
    "  Preview the resolved paths:\n",
    "    $ mozjs-update --dry-run mozjs-52.9.1.tar.bz2",
))]
pub struct UpdateCli {
    /// SpiderMonkey source tarball to import; extraction is skipped without one.
    #[arg(value_name = "TARBALL")]
    pub tarball: Option<Utf8PathBuf>,

    /// Skip manifest stripping, crate pruning and patch application.
    #[arg(long)]
    pub no_patch: bool,

    /// Skip regenerating and committing configure.
    #[arg(long)]
    pub no_configure: bool,

    /// Flags shared by the update tools.
    #[command(flatten)]
    pub common: CommonArgs,
}

impl UpdateCli {
    /// The steps this invocation asks for.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use mozjs_updater::cli::UpdateCli;
    ///
    /// let cli = UpdateCli::parse_from(["mozjs-update", "--no-configure", "release.tar.gz"]);
    /// let plan = cli.plan();
    /// assert!(plan.patch);
    /// assert!(!plan.configure);
    /// assert!(plan.commit);
    /// ```
    #[must_use]
    pub fn plan(&self) -> RunPlan {
        RunPlan {
            tarball: self.tarball.clone(),
            patch: !self.no_patch,
            configure: !self.no_configure,
            commit: true,
        }
    }
}

/// Merge a SpiderMonkey release into `mozjs-sys/mozjs/`.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "mozjs-sys-update")]
#[command(version, about)]
#[command(long_about = concat!(
    "Merge a SpiderMonkey release into mozjs-sys/mozjs/.\n\n",
    "The tarball's single top-level directory is synchronised into ",
    "mozjs-sys/mozjs with rsync, honouring the filter rules in ",
    "mozjs-sys/etc/filters.txt, and the result is committed. The patches in ",
    "mozjs-sys/etc/patches are then applied in file name order; hunks that do ",
    "not apply are left behind as .rej files for manual resolution.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Merge a release, commit it and apply the patches:\n",
    "    $ mozjs-sys-update firefox-115.0esr.source.tar.xz\n\n",
    "  Merge without committing, leaving the changes staged for review:\n",
    "    $ mozjs-sys-update --no-commit --no-patch firefox-115.0esr.source.tar.xz\n\n",
    "  Re-apply the patches only:\n",
    "    $ mozjs-sys-update",
))]
pub struct SysUpdateCli {
    /// SpiderMonkey source tarball to merge; extraction is skipped without one.
    #[arg(value_name = "TARBALL")]
    pub tarball: Option<Utf8PathBuf>,

    /// Skip patch application.
    #[arg(long)]
    pub no_patch: bool,

    /// Do not commit the merged tree.
    #[arg(long)]
    pub no_commit: bool,

    /// Flags shared by the update tools.
    #[command(flatten)]
    pub common: CommonArgs,
}

impl SysUpdateCli {
    /// The steps this invocation asks for. This target never regenerates
    /// configure.
    #[must_use]
    pub fn plan(&self) -> RunPlan {
        RunPlan {
            tarball: self.tarball.clone(),
            patch: !self.no_patch,
            configure: false,
            commit: !self.no_commit,
        }
    }
}

/// Flags understood by every update tool.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Repository root all vendored paths are relative to [default: current directory].
    #[arg(short = 'C', long, value_name = "DIR")]
    pub repo_root: Option<Utf8PathBuf>,

    /// Read target overrides from FILE instead of the target's default vendor.toml.
    #[arg(long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Kill any external command still running after SECS seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Show the resolved target and steps, then exit without changing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

/// Generate raw `jsapi.h` bindings with bindgen.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "mozjs-gen-bindings")]
#[command(version, about)]
#[command(after_help = concat!(
    "Run from the bindings crate directory; the header and include paths are ",
    "relative to it. Output is written to jsapi.rs.",
))]
pub struct BindgenCli {
    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(short, long = "verbose", action = ArgAction::Count)]
    pub verbosity: u8,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
