//! One-shot generation of raw `jsapi.h` bindings with the `bindgen` tool.
//!
//! The paths are the ones the binding crate has always been generated with,
//! relative to its own directory; the system include directories are those of
//! the machines it was last generated on. Adjust them locally if needed.
//!
//! The glue bindings were generated by hand, for reference:
//!
//! ```text
//! DYLD_LIBRARY_PATH=~/versioned/rust-mozilla/build/llvm/x86_64-apple-darwin/Release+Asserts/lib/ \
//!   ~/versioned/rust-bindgen/bindgen ./jsglue.c -I ../../build/src/mozjs/dist/include/ -match glue > glue.rs
//!
//! # on Fedora 17
//! LD_LIBRARY_PATH=~/sdb/rust/build/llvm/x86_64-unknown-linux-gnu/Release+Asserts/lib/ \
//!   ~/sdb/rust-bindgen/bindgen ./jsglue.c -I ../../build/src/mozjs/dist/include/ \
//!   -isystem /usr/lib/gcc/x86_64-redhat-linux/4.7.0/include/ -match glue > glue.rs
//! ```
//!
//! Remember to mark all generated glue functions as `#[rust_stack]`.

use crate::error::Result;
use crate::runner::{CommandRunner, Invocation, StdoutMode, run_checked};

/// A `bindgen` run over one header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindgenJob {
    /// The bindgen executable.
    pub tool: String,
    /// Library the bindings link against (`-l`).
    pub library: String,
    /// Output file (`-o`).
    pub output: String,
    /// Only declarations from files matching this are emitted (`-match`).
    pub match_pattern: String,
    /// The header to bind.
    pub header: String,
    /// User include directories (`-I`).
    pub includes: Vec<String>,
    /// System include directories (`-isystem`).
    pub system_includes: Vec<String>,
}

impl Default for BindgenJob {
    fn default() -> Self {
        Self {
            tool: "bindgen".to_owned(),
            library: "mozjs".to_owned(),
            output: "jsapi.rs".to_owned(),
            match_pattern: "js".to_owned(),
            header: "../mozjs/js/src/jsapi.h".to_owned(),
            includes: vec!["../mozjs/js/src/dist/include".to_owned()],
            system_includes: vec![
                "/usr/lib/x86_64-linux-gnu/gcc/x86_64-linux-gnu/4.5/include".to_owned(),
                "/usr/lib/gcc/x86_64-redhat-linux/4.7.0/include".to_owned(),
            ],
        }
    }
}

impl BindgenJob {
    /// The command line for this job. Tool output goes straight to the
    /// terminal.
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        let mut invocation = Invocation::new(self.tool.as_str())
            .args([
                "-l",
                self.library.as_str(),
                "-o",
                self.output.as_str(),
                "-match",
                self.match_pattern.as_str(),
                self.header.as_str(),
            ])
            .stdout(StdoutMode::Inherit);
        for dir in &self.includes {
            invocation = invocation.args(["-I", dir.as_str()]);
        }
        for dir in &self.system_includes {
            invocation = invocation.args(["-isystem", dir.as_str()]);
        }
        invocation
    }
}

/// Runs `job`.
///
/// # Errors
///
/// Returns an error if `bindgen` is missing or exits unsuccessfully.
pub fn generate_bindings(runner: &dyn CommandRunner, job: &BindgenJob) -> Result<()> {
    run_checked(runner, &job.invocation()).map(drop)
}
