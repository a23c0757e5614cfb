//! Git access for the commit workflow.
//!
//! [`VcsOps`] is the seam the workflow talks to. [`Git`] implements it with
//! git2 for reads and the `git` binary for writes.

pub mod exclude;
pub mod repo;
pub mod runner;

use std::collections::BTreeSet;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::AcpError;

pub use repo::RecentCommit;
pub use runner::{GitOutput, GitRunner};

/// Which side of the index a diff covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    /// HEAD to index (`git diff --staged`).
    Staged,
    /// Index to working tree, untracked files included.
    Unstaged,
}

/// Version-control operations used by the workflow.
pub trait VcsOps: Send + Sync {
    /// Changed paths (staged, unstaged and untracked), excluding build
    /// artifacts and env files.
    fn changed_files(&self) -> Result<BTreeSet<String>, AcpError>;

    /// Paths currently staged.
    fn staged_files(&self) -> Result<BTreeSet<String>, AcpError>;

    fn current_branch(&self) -> Result<String, AcpError>;

    /// Stage `files`. A single `"."` stages everything.
    fn add_files(&self, files: &[String]) -> Result<(), AcpError>;

    /// Empty the staging area, leaving the working tree untouched. Runs
    /// even after the run was cancelled.
    fn unstage(&self) -> Result<(), AcpError>;

    fn commit(&self, message: &str) -> Result<(), AcpError>;

    fn push(&self, branch: &str) -> Result<(), AcpError>;

    fn diff(&self, kind: DiffKind) -> Result<String, AcpError>;

    fn recent_commits(&self, n: usize) -> Result<Vec<RecentCommit>, AcpError>;

    /// Recent commits that touched any file named in `diff`.
    fn related_commits(&self, diff: &str, n: usize) -> Result<Vec<RecentCommit>, AcpError>;
}

/// Production [`VcsOps`] for a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    runner: GitRunner,
    remote: String,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>, remote: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            runner: GitRunner::new(workdir, cancel),
            remote: remote.into(),
        }
    }

    fn open(&self) -> Result<git2::Repository, AcpError> {
        repo::open(self.runner.workdir())
    }
}

impl VcsOps for Git {
    fn changed_files(&self) -> Result<BTreeSet<String>, AcpError> {
        repo::changed_files(&self.open()?)
    }

    fn staged_files(&self) -> Result<BTreeSet<String>, AcpError> {
        repo::staged_files(&self.open()?)
    }

    fn current_branch(&self) -> Result<String, AcpError> {
        repo::current_branch(&self.open()?)
    }

    fn add_files(&self, files: &[String]) -> Result<(), AcpError> {
        if files.is_empty() {
            return Err(AcpError::git("No files to stage."));
        }

        let mut args = vec!["add", "--all", "--"];
        args.extend(files.iter().map(String::as_str));

        self.runner
            .run(&args)
            .map(|_| ())
            .map_err(|e| e.with_context("Failed to add files to staging area"))
    }

    fn unstage(&self) -> Result<(), AcpError> {
        // `git reset HEAD` needs a commit to reset to
        let args: &[&str] = if repo::has_commits(&self.open()?)? {
            &["reset", "-q", "HEAD"]
        } else {
            &["rm", "-r", "-q", "--cached", "--ignore-unmatch", "."]
        };

        // Rollback still has to run after Ctrl-C
        self.runner
            .run_uncancellable(args)
            .map(|_| ())
            .map_err(|e| e.with_context("Failed to unstage files"))
    }

    fn commit(&self, message: &str) -> Result<(), AcpError> {
        self.runner
            .run(&["commit", "-m", message])
            .map(|_| ())
            .map_err(|e| e.with_context("Failed to commit changes"))
    }

    fn push(&self, branch: &str) -> Result<(), AcpError> {
        debug!("Pushing {} to {}", branch, self.remote);
        self.runner
            .run(&["push", &self.remote, branch])
            .map(|_| ())
            .map_err(|e| e.with_context("Failed to push changes"))
    }

    fn diff(&self, kind: DiffKind) -> Result<String, AcpError> {
        repo::diff_text(&self.open()?, kind)
    }

    fn recent_commits(&self, n: usize) -> Result<Vec<RecentCommit>, AcpError> {
        repo::recent_commits(&self.open()?, n)
    }

    fn related_commits(&self, diff: &str, n: usize) -> Result<Vec<RecentCommit>, AcpError> {
        repo::related_commits(&self.open()?, diff, n)
    }
}
