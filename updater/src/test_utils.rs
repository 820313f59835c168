//! Shared test utilities for the updater crate.

use crate::error::{Result, UpdaterError};
use crate::runner::{CommandRunner, Invocation};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The program to execute (e.g., "git").
    pub program: &'static str,
    /// The arguments to pass to the program.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

impl ExpectedCall {
    /// An expected call that succeeds with empty output.
    #[must_use]
    pub fn ok<I, S>(program: &'static str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::returning(program, args, Ok(success_output()))
    }

    /// An expected call that returns `result`.
    #[must_use]
    pub fn returning<I, S>(program: &'static str, args: I, result: Result<Output>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program,
            args: args.into_iter().map(Into::into).collect(),
            result,
        }
    }
}

/// A stub implementation of [`CommandRunner`] for testing.
///
/// Records every invocation it receives and answers them from a queue of
/// expected calls, in order. Invocations that do not match the head of the
/// queue are answered with [`UpdaterError::StubMismatch`].
#[derive(Debug, Default)]
pub struct StubRunner {
    expected: RefCell<VecDeque<ExpectedCall>>,
    received: RefCell<Vec<Invocation>>,
}

impl StubRunner {
    /// Creates a new `StubRunner` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            received: RefCell::new(Vec::new()),
        }
    }

    /// Returns every invocation received so far, in order.
    #[must_use]
    pub fn received(&self) -> Vec<Invocation> {
        self.received.borrow().clone()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        let remaining = self.expected.borrow();
        assert!(
            remaining.is_empty(),
            "expected no further command invocations, {} remain: {:?}",
            remaining.len(),
            remaining.iter().map(|call| call.program).collect::<Vec<_>>()
        );
    }
}

impl CommandRunner for StubRunner {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        self.received.borrow_mut().push(invocation.clone());

        let mut expected = self.expected.borrow_mut();
        let Some(call) = expected.pop_front() else {
            return Err(UpdaterError::StubMismatch {
                message: format!("unexpected invocation: {invocation}"),
            });
        };

        if call.program != invocation.program() || call.args.as_slice() != invocation.arguments() {
            return Err(UpdaterError::StubMismatch {
                message: format!(
                    "expected `{} {}`, received `{invocation}`",
                    call.program,
                    call.args.join(" ")
                ),
            });
        }

        call.result
    }
}
