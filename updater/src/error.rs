//! Error types for the SpiderMonkey vendoring tools.
//!
//! Every step of an update run reports failures through [`UpdaterError`]. The
//! variants fall into three groups: precondition failures detected before any
//! side effect happens, failures of external tools, and plain I/O errors. No
//! step retries; the first error ends the run.

use camino::{Utf8Path, Utf8PathBuf};
use std::process::ExitStatus;
use thiserror::Error;

/// Errors that can occur while updating the vendored engine.
#[derive(Debug, Error)]
pub enum UpdaterError {
    /// The tarball passed on the command line does not exist.
    #[error("tarball not found at {path}")]
    TarballNotFound {
        /// Path that was checked.
        path: Utf8PathBuf,
    },

    /// The archive does not contain exactly one top-level entry.
    #[error("expected exactly one directory in the tarball, found: {}", display_entries(.entries))]
    AmbiguousArchive {
        /// Sorted names of the top-level entries that were found.
        entries: Vec<String>,
    },

    /// The single top-level entry of the archive is not a directory.
    #[error("top-level entry {entry} in the tarball is not a directory")]
    RootNotDirectory {
        /// Name of the offending entry.
        entry: String,
    },

    /// An archive entry tries to escape the extraction directory.
    #[error("path traversal detected in archive entry: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// A path on disk is not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the path.
        path: String,
    },

    /// The vendor configuration file could not be read or parsed.
    #[error("invalid vendor configuration at {path}: {reason}")]
    InvalidConfig {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// An external command exited unsuccessfully.
    #[error("`{command}` failed with {status}{}", display_stderr(.stderr))]
    CommandFailed {
        /// The rendered command line.
        command: String,
        /// Exit status reported by the process.
        status: ExitStatus,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// An external command did not finish within the configured timeout.
    #[error("`{command}` timed out after {seconds} seconds")]
    CommandTimedOut {
        /// The rendered command line.
        command: String,
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// An external tool is not installed or not on `PATH`.
    #[error("{tool} not found; is it installed and on PATH?")]
    ToolNotFound {
        /// Name of the missing program.
        tool: String,
    },

    /// None of the accepted autoconf executables could be found.
    #[error("no autoconf 2.13 found on PATH (tried {})", .candidates.join(", "))]
    NoConfigureTool {
        /// Executable names that were tried, in order.
        candidates: Vec<String>,
    },

    /// Walking a directory tree failed.
    #[error("failed to walk directory tree")]
    WalkFailed {
        /// The underlying walk error.
        #[source]
        source: walkdir::Error,
    },

    /// A filesystem operation on a known path failed.
    #[error("failed to {action} {path}")]
    Filesystem {
        /// What was being done, e.g. "read directory".
        action: &'static str,
        /// The path it was done to.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run was stopped with Ctrl-C.
    #[error("interrupted")]
    Interrupted,

    /// The Ctrl-C handler could not be installed.
    #[error("failed to install the Ctrl-C handler")]
    SignalHandler {
        /// The error reported by `ctrlc`.
        #[source]
        source: ctrlc::Error,
    },

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl From<walkdir::Error> for UpdaterError {
    fn from(source: walkdir::Error) -> Self {
        Self::WalkFailed { source }
    }
}

impl UpdaterError {
    /// Returns a mapper from an I/O error to [`UpdaterError::Filesystem`] for
    /// `action` on `path`.
    pub(crate) fn filesystem(
        action: &'static str,
        path: &Utf8Path,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.to_owned();
        move |source| Self::Filesystem {
            action,
            path,
            source,
        }
    }
}

fn display_entries(entries: &[String]) -> String {
    if entries.is_empty() {
        "nothing".to_owned()
    } else {
        entries.join(", ")
    }
}

fn display_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Result type alias using [`UpdaterError`].
pub type Result<T> = std::result::Result<T, UpdaterError>;
