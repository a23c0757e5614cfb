//! Synchronous `git` subprocess runner.
//!
//! Commands shell out to the system `git` binary so they inherit the user's
//! git config, SSH agent and credential store. Non-zero exits are mapped to
//! friendly messages.

use std::path::PathBuf;
use std::process::Command;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::AcpError;

/// Captured output of a finished git command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

/// Runs git commands in a working directory.
#[derive(Debug, Clone)]
pub struct GitRunner {
    workdir: PathBuf,
    cancel: CancellationToken,
}

impl GitRunner {
    pub fn new(workdir: impl Into<PathBuf>, cancel: CancellationToken) -> Self {
        Self {
            workdir: workdir.into(),
            cancel,
        }
    }

    pub fn workdir(&self) -> &PathBuf {
        &self.workdir
    }

    /// Run `git <args>` and return its output, or a friendly error on a
    /// non-zero exit. Refuses to start once the token is cancelled.
    pub fn run(&self, args: &[&str]) -> Result<GitOutput, AcpError> {
        if self.cancel.is_cancelled() {
            return Err(AcpError::cancelled());
        }
        self.run_uncancellable(args)
    }

    /// Like [`GitRunner::run`] but ignores the cancellation token.
    ///
    /// Only for cleanup that must still happen after Ctrl-C, such as
    /// emptying the index.
    pub fn run_uncancellable(&self, args: &[&str]) -> Result<GitOutput, AcpError> {
        debug!("Running: git {}", args.join(" "));

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    git_not_installed()
                } else {
                    AcpError::git(format!("Failed to run git {}: {}", args.join(" "), e))
                }
            })?;

        let result = GitOutput {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            code: output.status.code().unwrap_or(-1),
        };

        if !output.status.success() {
            // `git commit` reports "nothing to commit" on stdout
            let detail = if result.stderr.is_empty() {
                &result.stdout
            } else {
                &result.stderr
            };
            debug!("git {} exited with {}: {}", args.join(" "), result.code, detail);
            return Err(map_git_error(detail, args));
        }

        Ok(result)
    }
}

/// Check that `git` is on PATH.
pub fn check_git_installed() -> Result<(), AcpError> {
    which::which("git").map(|_| ()).map_err(|_| git_not_installed())
}

fn git_not_installed() -> AcpError {
    AcpError::git("Git is not installed or not in PATH.")
        .with_suggestion("Install git from https://git-scm.com and make sure it is on your PATH.")
}

/// Map git's stderr to a user-facing error.
pub fn map_git_error(stderr: &str, args: &[&str]) -> AcpError {
    let lowered = stderr.to_lowercase();

    if lowered.contains("not a git repository") {
        return AcpError::git("Not a git repository.")
            .with_suggestion("Run 'git init' or check directory");
    }
    if lowered.contains("nothing to commit") {
        return AcpError::no_op("No changes to commit.")
            .with_suggestion("Stage some changes first with 'git add' or create new files.");
    }
    if lowered.contains("permission denied") {
        return AcpError::git("Permission denied.")
            .with_suggestion("Check your file permissions and Git credentials.");
    }
    if let ["push", remote, branch, ..] = args {
        if lowered.contains("rejected") {
            return AcpError::git("Push rejected.").with_suggestion(format!(
                "Please pull the latest changes first: git pull {} {}",
                remote, branch
            ));
        }
        if lowered.contains("no upstream branch") {
            return AcpError::git("No upstream branch.").with_suggestion(format!(
                "Set the remote with: git push --set-upstream {} {}",
                remote, branch
            ));
        }
    }
    if lowered.contains("could not resolve host") {
        return AcpError::git("Could not reach the remote host.")
            .with_suggestion("Check your network connection and the remote URL.");
    }
    if lowered.contains("pathspec") && lowered.contains("did not match") {
        return AcpError::git(format!("Path not found: {}", stderr))
            .with_suggestion("Check the file names passed to git-acp.");
    }
    if lowered.contains("does not appear to be a git repository")
        || lowered.contains("no such remote")
    {
        return AcpError::git("Remote not found.")
            .with_suggestion("Check your remote with 'git remote -v'.");
    }
    if lowered.contains("not a valid branch name")
        || (lowered.contains("src refspec") && lowered.contains("does not match"))
    {
        return AcpError::git("Branch not found.")
            .with_suggestion("Check the branch name with 'git branch -a'.");
    }

    AcpError::git(format!("git {} failed: {}", args.join(" "), stderr))
}
