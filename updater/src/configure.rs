//! Regeneration of SpiderMonkey's autoconf 2.13 configure scripts.
//!
//! The generated `configure` and `old-configure` are ignored by the engine's
//! own `.gitignore`, so they are force-added and committed together after
//! every update. autoconf 2.13 ships as `autoconf2.13` on Debian-like systems
//! and as `autoconf213` elsewhere; the first candidate found on `PATH` wins.

use crate::error::{Result, UpdaterError};
use crate::git::Git;
use crate::runner::{CommandRunner, Invocation, StdoutMode, command_failed, run_checked};
use camino::Utf8Path;
use log::debug;

/// Template fed to autoconf to produce `old-configure`.
pub const OLD_CONFIGURE_TEMPLATE: &str = "old-configure.in";

/// Returns the first of `candidates` that runs with `--version`.
///
/// # Errors
///
/// Returns [`UpdaterError::NoConfigureTool`] if none is on `PATH`. A
/// candidate that exists but fails its version probe is an error as well.
pub fn find_autoconf(runner: &dyn CommandRunner, candidates: &[String]) -> Result<String> {
    for candidate in candidates {
        let probe = Invocation::new(candidate.as_str()).arg("--version");
        match runner.run(&probe) {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                debug!(
                    "using {candidate}: {}",
                    stdout.lines().next().unwrap_or_default()
                );
                return Ok(candidate.clone());
            }
            Ok(output) => return Err(command_failed(&probe, &output)),
            Err(UpdaterError::ToolNotFound { .. }) => {
                debug!("{candidate} not found, trying the next candidate");
            }
            Err(err) => return Err(err),
        }
    }

    Err(UpdaterError::NoConfigureTool {
        candidates: candidates.to_vec(),
    })
}

/// Regenerates `configure` and `old-configure` in `configure_dir` and
/// commits both.
///
/// `configure_dir` is relative to the repository root of `git`.
///
/// # Errors
///
/// Returns an error if no autoconf is found or any command fails.
pub fn generate_configure(
    runner: &dyn CommandRunner,
    git: &Git<'_>,
    configure_dir: &Utf8Path,
    candidates: &[String],
    commit_message: &str,
) -> Result<()> {
    let autoconf = find_autoconf(runner, candidates)?;
    let work_dir = git.repo_root().join(configure_dir);

    run_checked(runner, &Invocation::new(autoconf.as_str()).current_dir(&work_dir))?;
    git.add_force(&configure_dir.join("configure"))?;

    let old_configure = work_dir.join("old-configure");
    run_checked(
        runner,
        &Invocation::new(autoconf.as_str())
            .arg(OLD_CONFIGURE_TEMPLATE)
            .current_dir(&work_dir)
            .stdout(StdoutMode::File(old_configure)),
    )?;
    git.add_force(&configure_dir.join("old-configure"))?;

    git.commit(commit_message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::MockCommandRunner;
    use crate::test_utils::{ExpectedCall, StubRunner, failure_output, success_output};
    use mockall::Sequence;

    fn candidates() -> Vec<String> {
        vec!["autoconf2.13".to_owned(), "autoconf213".to_owned()]
    }

    fn not_found(tool: &str) -> UpdaterError {
        UpdaterError::ToolNotFound {
            tool: tool.to_owned(),
        }
    }

    #[test]
    fn prefers_first_candidate() {
        let runner = StubRunner::new(vec![ExpectedCall::ok("autoconf2.13", ["--version"])]);
        let found = find_autoconf(&runner, &candidates()).expect("found");
        assert_eq!(found, "autoconf2.13");
        runner.assert_finished();
    }

    #[test]
    fn falls_back_when_first_candidate_is_missing() {
        let runner = StubRunner::new(vec![
            ExpectedCall::returning("autoconf2.13", ["--version"], Err(not_found("autoconf2.13"))),
            ExpectedCall::ok("autoconf213", ["--version"]),
        ]);
        let found = find_autoconf(&runner, &candidates()).expect("found");
        assert_eq!(found, "autoconf213");
    }

    #[test]
    fn fails_when_no_candidate_exists() {
        let runner = StubRunner::new(vec![
            ExpectedCall::returning("autoconf2.13", ["--version"], Err(not_found("autoconf2.13"))),
            ExpectedCall::returning("autoconf213", ["--version"], Err(not_found("autoconf213"))),
        ]);
        let err = find_autoconf(&runner, &candidates()).expect_err("nothing found");
        assert!(matches!(err, UpdaterError::NoConfigureTool { ref candidates } if candidates.len() == 2));
    }

    #[test]
    fn broken_candidate_is_fatal() {
        let runner = StubRunner::new(vec![ExpectedCall::returning(
            "autoconf2.13",
            ["--version"],
            Ok(failure_output("segfault")),
        )]);
        let err = find_autoconf(&runner, &candidates()).expect_err("probe failed");
        assert!(matches!(err, UpdaterError::CommandFailed { .. }));
    }

    #[test]
    fn generates_both_scripts_then_commits_once() {
        let mut runner = MockCommandRunner::new();
        let mut seq = Sequence::new();
        let steps: [(&'static str, &'static [&'static str]); 6] = [
            ("autoconf2.13", &["--version"]),
            ("autoconf2.13", &[]),
            ("git", &["add", "-f", "mozjs/js/src/configure"]),
            ("autoconf2.13", &["old-configure.in"]),
            ("git", &["add", "-f", "mozjs/js/src/old-configure"]),
            ("git", &["commit", "-m", "Generate configure."]),
        ];
        for (program, args) in steps {
            runner
                .expect_run()
                .withf(move |inv| inv.program() == program && inv.arguments() == args)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(success_output()));
        }

        let git = Git::new(&runner, Utf8Path::new("/repo"));
        generate_configure(
            &runner,
            &git,
            Utf8Path::new("mozjs/js/src"),
            &candidates(),
            "Generate configure.",
        )
        .expect("configure generation succeeds");
    }

    #[test]
    fn old_configure_output_is_redirected_into_the_source_dir() {
        let runner = StubRunner::new(vec![
            ExpectedCall::ok("autoconf2.13", ["--version"]),
            ExpectedCall::ok("autoconf2.13", Vec::<String>::new()),
            ExpectedCall::ok("git", ["add", "-f", "mozjs/js/src/configure"]),
            ExpectedCall::ok("autoconf2.13", ["old-configure.in"]),
            ExpectedCall::ok("git", ["add", "-f", "mozjs/js/src/old-configure"]),
            ExpectedCall::ok("git", ["commit", "-m", "Generate configure."]),
        ]);
        let git = Git::new(&runner, Utf8Path::new("/repo"));
        generate_configure(
            &runner,
            &git,
            Utf8Path::new("mozjs/js/src"),
            &candidates(),
            "Generate configure.",
        )
        .expect("configure generation succeeds");

        let received = runner.received();
        let template_run = received
            .iter()
            .find(|inv| inv.arguments() == ["old-configure.in"])
            .expect("template run recorded");
        assert_eq!(
            template_run.stdout_mode(),
            &StdoutMode::File("/repo/mozjs/js/src/old-configure".into())
        );
        assert_eq!(
            template_run.working_dir(),
            Some(Utf8Path::new("/repo/mozjs/js/src"))
        );
    }
}
