//! Maintenance tooling for vendoring SpiderMonkey into the mozjs repository.
//!
//! The crate backs three binaries: `mozjs-update` imports a release tarball
//! into `mozjs/`, `mozjs-sys-update` merges one into `mozjs-sys/mozjs/`, and
//! `mozjs-gen-bindings` regenerates the raw `jsapi.h` bindings. Every external
//! tool (git, rsync, tar, autoconf, bindgen) is reached through the
//! [`runner::CommandRunner`] trait, so the whole pipeline can be exercised
//! against a stub.
//!
//! # Modules
//!
//! - [`archive`] - Tarball extraction down to its single top-level directory
//! - [`bindgen`] - One-shot `jsapi.h` binding generation
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Vendor target presets and TOML overrides
//! - [`configure`] - autoconf 2.13 configure regeneration
//! - [`error`] - Error type shared by every step
//! - [`git`] - The git operations the pipeline needs
//! - [`install`] - Replacing or merging the vendored tree
//! - [`interrupt`] - Ctrl-C handling
//! - [`logging`] - `env_logger` initialisation
//! - [`manifest`] - Cargo manifest stripping
//! - [`output`] - Progress, dry-run and error output
//! - [`patches`] - Ordered patch application
//! - [`pipeline`] - Step sequencing and the shared driver
//! - [`prune`] - Removal of vendored third-party crates
//! - [`runner`] - External command execution

pub mod archive;
pub mod bindgen;
pub mod cli;
pub mod config;
pub mod configure;
pub mod error;
pub mod git;
pub mod install;
pub mod interrupt;
pub mod logging;
pub mod manifest;
pub mod output;
pub mod patches;
pub mod pipeline;
pub mod prune;
pub mod runner;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
