//! The boundary between the update steps and the external tools they drive.
//!
//! Every subprocess (`git`, `tar`, `rsync`, `autoconf`, `bindgen`) is described
//! by an [`Invocation`] and executed through a [`CommandRunner`]. Keeping the
//! boundary this narrow lets the steps stay plain sequencing logic and lets the
//! tests substitute a stub or mock for the real tools.

use crate::error::{Result, UpdaterError};
use crate::interrupt;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fmt;
use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Where the standard output of an invocation goes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StdoutMode {
    /// Capture stdout into [`Output::stdout`].
    #[default]
    Capture,
    /// Discard stdout.
    Null,
    /// Truncate the file at this path and write stdout into it.
    File(Utf8PathBuf),
    /// Share the parent's stdout and stderr.
    Inherit,
}

/// A single external command: program, arguments, extra environment,
/// working directory and stdout disposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    cwd: Option<Utf8PathBuf>,
    stdout: StdoutMode,
}

impl Invocation {
    /// Starts describing an invocation of `program`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mozjs_updater::runner::Invocation;
    ///
    /// let invocation = Invocation::new("git").arg("commit").args(["-m", "Update SpiderMonkey"]);
    /// assert_eq!(invocation.to_string(), "git commit -m 'Update SpiderMonkey'");
    /// ```
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
            stdout: StdoutMode::default(),
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets an environment variable for the command only.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Runs the command from `dir` instead of the current directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Sets where stdout goes.
    #[must_use]
    pub fn stdout(mut self, mode: StdoutMode) -> Self {
        self.stdout = mode;
        self
    }

    /// The program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments, in order.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Environment variables set on top of the inherited environment.
    #[must_use]
    pub fn environment(&self) -> &[(String, String)] {
        &self.env
    }

    /// The working directory, if one was set.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Utf8Path> {
        self.cwd.as_deref()
    }

    /// The stdout disposition.
    #[must_use]
    pub fn stdout_mode(&self) -> &StdoutMode {
        &self.stdout
    }

    fn to_command(&self) -> Result<Command> {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command.envs(self.env.iter().map(|(key, value)| (key, value)));
        if let Some(dir) = &self.cwd {
            command.current_dir(dir.as_std_path());
        }

        match &self.stdout {
            StdoutMode::Capture => {
                command.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
            StdoutMode::Null => {
                command.stdout(Stdio::null()).stderr(Stdio::piped());
            }
            StdoutMode::File(path) => {
                let file = File::create(path)?;
                command.stdout(Stdio::from(file)).stderr(Stdio::piped());
            }
            StdoutMode::Inherit => {
                command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
        }

        Ok(command)
    }
}

/// Renders the command line so that it can be pasted into a POSIX shell.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{key}={} ", ShellWord(value))?;
        }
        write!(f, "{}", ShellWord(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", ShellWord(arg))?;
        }
        Ok(())
    }
}

struct ShellWord<'a>(&'a str);

impl fmt::Display for ShellWord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = self.0;
        let plain = !word.is_empty()
            && word
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
        if plain {
            return f.write_str(word);
        }
        f.write_str("'")?;
        f.write_str(&word.replace('\'', "'\\''"))?;
        f.write_str("'")
    }
}

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    /// Runs the invocation to completion and returns its output.
    ///
    /// A non-zero exit status is *not* an error at this level; use
    /// [`run_checked`] when it should be.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::ToolNotFound`] when the program cannot be found,
    /// [`UpdaterError::CommandTimedOut`] when a timeout elapses, and
    /// [`UpdaterError::Io`] for any other spawn or wait failure.
    fn run(&self, invocation: &Invocation) -> Result<Output>;
}

/// Runs `invocation` and turns a non-zero exit status into
/// [`UpdaterError::CommandFailed`].
///
/// # Errors
///
/// Propagates runner errors and reports unsuccessful exits.
pub fn run_checked(runner: &dyn CommandRunner, invocation: &Invocation) -> Result<Output> {
    let output = runner.run(invocation)?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(command_failed(invocation, &output))
    }
}

/// Builds the [`UpdaterError::CommandFailed`] for an unsuccessful output.
#[must_use]
pub fn command_failed(invocation: &Invocation, output: &Output) -> UpdaterError {
    UpdaterError::CommandFailed {
        command: invocation.to_string(),
        status: output.status,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
    }
}

/// Executes commands on the host system.
///
/// Commands block until they finish. No timeout applies unless one is set
/// with [`SystemCommandRunner::with_timeout`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner {
    timeout: Option<Duration>,
}

impl SystemCommandRunner {
    /// A runner that waits indefinitely for each command.
    #[must_use]
    pub const fn new() -> Self {
        Self { timeout: None }
    }

    /// A runner that kills commands still running after `timeout`.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        debug!("running {invocation}");
        let mut command = invocation.to_command()?;
        let child = command
            .spawn()
            .map_err(|err| spawn_error(invocation, err))?;

        let output = match self.timeout {
            None => child.wait_with_output()?,
            Some(timeout) => wait_with_timeout(child, timeout, invocation)?,
        };
        interrupt::check()?;
        Ok(output)
    }
}

fn spawn_error(invocation: &Invocation, err: std::io::Error) -> UpdaterError {
    if err.kind() == ErrorKind::NotFound {
        UpdaterError::ToolNotFound {
            tool: invocation.program.clone(),
        }
    } else {
        UpdaterError::Io(err)
    }
}

/// Waits for `child`, killing it once `timeout` elapses.
///
/// The pipes are drained on their own threads while waiting; a child that
/// fills a pipe buffer would otherwise block until the timeout.
fn wait_with_timeout(
    mut child: Child,
    timeout: Duration,
    invocation: &Invocation,
) -> Result<Output> {
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let Some(status) = child.wait_timeout(timeout)? else {
        if child.kill().is_err() {
            debug!("{invocation} exited before it could be killed");
        }
        child.wait()?;
        return Err(UpdaterError::CommandTimedOut {
            command: invocation.to_string(),
            seconds: timeout.as_secs(),
        });
    };

    Ok(Output {
        status,
        stdout: collect(stdout)?,
        stderr: collect(stderr)?,
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        pipe.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

fn collect(reader: Option<JoinHandle<io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    let Some(reader) = reader else {
        return Ok(Vec::new());
    };
    let bytes = reader
        .join()
        .map_err(|_| io::Error::other("output reader thread panicked"))??;
    Ok(bytes)
}
