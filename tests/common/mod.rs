//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use git2::{IndexAddOption, Oid, Repository, Signature};
use tokio_util::sync::CancellationToken;

use git_acp::commit::MessageGenerator;
use git_acp::config::Config;
use git_acp::error::AcpError;
use git_acp::git::{DiffKind, RecentCommit, VcsOps};
use git_acp::workflow::UserInteraction;

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository on `main` in a temp directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        repo.set_head("refs/heads/main").expect("Failed to set HEAD");

        // The git binary needs an identity for `git commit`
        let mut config = repo.config().expect("Failed to open repo config");
        config.set_str("user.name", "Test User").expect("Failed to set user.name");
        config
            .set_str("user.email", "test@example.com")
            .expect("Failed to set user.email");
        config.set_bool("commit.gpgsign", false).expect("Failed to set gpgsign");

        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn signature(&self) -> Signature<'_> {
        Signature::now("Test User", "test@example.com").expect("Failed to create signature")
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Stage everything and commit it. Returns the commit OID.
    pub fn commit_all(&self, message: &str) -> Oid {
        let sig = self.signature();

        let mut index = self.repo.index().expect("Failed to get index");
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .expect("Failed to add files");
        index
            .update_all(["*"].iter(), None)
            .expect("Failed to record deletions");
        index.write().expect("Failed to write index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Write `rel` and commit it.
    pub fn commit_file(&self, rel: &str, content: &str, message: &str) -> Oid {
        self.write(rel, content);
        self.commit_all(message)
    }

    /// Create a branch at `oid` and check it out.
    pub fn checkout_new_branch(&self, name: &str, oid: Oid) {
        let commit = self.repo.find_commit(oid).expect("Failed to find commit");
        self.repo.branch(name, &commit, false).expect("Failed to create branch");
        self.repo
            .set_head(&format!("refs/heads/{}", name))
            .expect("Failed to switch branch");
        self.repo
            .checkout_head(Some(git2::build::CheckoutBuilder::new().force()))
            .expect("Failed to check out branch");
    }

    /// Add a bare repository as remote `name`. Keep the returned dir alive.
    pub fn add_bare_remote(&self, name: &str) -> tempfile::TempDir {
        let bare = tempfile::tempdir().expect("Failed to create temp directory");
        Repository::init_bare(bare.path()).expect("Failed to init bare repo");
        self.repo
            .remote(name, &bare.path().to_string_lossy())
            .expect("Failed to add remote");
        bare
    }

    /// Paths in the index that differ from HEAD.
    pub fn staged(&self) -> BTreeSet<String> {
        git_acp::git::repo::staged_files(&self.repo).expect("Failed to read status")
    }

    /// Subject of the commit HEAD points at.
    pub fn head_message(&self) -> String {
        self.repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map(|c| c.message().unwrap_or_default().to_string())
            .expect("Failed to read HEAD")
    }
}

/// True when the `git` binary can be spawned.
pub fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

/// A [`VcsOps`] operation a [`FakeVcs`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ChangedFiles,
    StagedFiles,
    CurrentBranch,
    AddFiles,
    Unstage,
    Commit,
    Push,
    Diff,
}

/// In-memory [`VcsOps`] that records every mutation.
pub struct FakeVcs {
    changed: BTreeSet<String>,
    staged: Mutex<BTreeSet<String>>,
    branch: String,
    diff: String,
    failures: HashSet<Op>,
    cancels: HashSet<Op>,
    added: Mutex<Vec<Vec<String>>>,
    commits: Mutex<Vec<String>>,
    pushes: Mutex<Vec<String>>,
    unstage_calls: AtomicUsize,
}

impl FakeVcs {
    /// A repository on `main` whose working tree changed `files`.
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            changed: files.into_iter().map(Into::into).collect(),
            staged: Mutex::new(BTreeSet::new()),
            branch: "main".to_string(),
            diff: "diff --git a/src/app.py b/src/app.py\n+print('hello')\n".to_string(),
            failures: HashSet::new(),
            cancels: HashSet::new(),
            added: Mutex::new(Vec::new()),
            commits: Mutex::new(Vec::new()),
            pushes: Mutex::new(Vec::new()),
            unstage_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_diff(mut self, diff: &str) -> Self {
        self.diff = diff.to_string();
        self
    }

    /// Start with `files` already in the index.
    pub fn with_staged<I, S>(self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Ok(mut staged) = self.staged.lock() {
            staged.extend(files.into_iter().map(Into::into));
        }
        self
    }

    pub fn failing(mut self, op: Op) -> Self {
        self.failures.insert(op);
        self
    }

    /// Make `op` return a cancellation error.
    pub fn cancelling(mut self, op: Op) -> Self {
        self.cancels.insert(op);
        self
    }

    pub fn unstage_count(&self) -> usize {
        self.unstage_calls.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> Vec<String> {
        self.commits.lock().unwrap().clone()
    }

    pub fn pushes(&self) -> Vec<String> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn added(&self) -> Vec<Vec<String>> {
        self.added.lock().unwrap().clone()
    }

    fn check(&self, op: Op) -> Result<(), AcpError> {
        if self.cancels.contains(&op) {
            return Err(AcpError::cancelled());
        }
        if self.failures.contains(&op) {
            return Err(AcpError::git(format!("injected {:?} failure", op)));
        }
        Ok(())
    }
}

impl VcsOps for FakeVcs {
    fn changed_files(&self) -> Result<BTreeSet<String>, AcpError> {
        self.check(Op::ChangedFiles)?;
        Ok(self.changed.clone())
    }

    fn staged_files(&self) -> Result<BTreeSet<String>, AcpError> {
        self.check(Op::StagedFiles)?;
        Ok(self.staged.lock().unwrap().clone())
    }

    fn current_branch(&self) -> Result<String, AcpError> {
        self.check(Op::CurrentBranch)?;
        Ok(self.branch.clone())
    }

    fn add_files(&self, files: &[String]) -> Result<(), AcpError> {
        self.check(Op::AddFiles)?;
        self.added.lock().unwrap().push(files.to_vec());

        let mut staged = self.staged.lock().unwrap();
        for file in files {
            if file == "." {
                staged.extend(self.changed.iter().cloned());
            } else if self.changed.contains(file) {
                staged.insert(file.clone());
            }
        }
        Ok(())
    }

    fn unstage(&self) -> Result<(), AcpError> {
        self.unstage_calls.fetch_add(1, Ordering::SeqCst);
        self.check(Op::Unstage)?;
        self.staged.lock().unwrap().clear();
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<(), AcpError> {
        self.check(Op::Commit)?;
        self.commits.lock().unwrap().push(message.to_string());
        self.staged.lock().unwrap().clear();
        Ok(())
    }

    fn push(&self, branch: &str) -> Result<(), AcpError> {
        self.check(Op::Push)?;
        self.pushes.lock().unwrap().push(branch.to_string());
        Ok(())
    }

    fn diff(&self, kind: DiffKind) -> Result<String, AcpError> {
        self.check(Op::Diff)?;
        let has_staged = !self.staged.lock().unwrap().is_empty();
        match kind {
            DiffKind::Staged if has_staged => Ok(self.diff.clone()),
            DiffKind::Staged => Ok(String::new()),
            DiffKind::Unstaged => Ok(self.diff.clone()),
        }
    }

    fn recent_commits(&self, _n: usize) -> Result<Vec<RecentCommit>, AcpError> {
        Ok(Vec::new())
    }

    fn related_commits(&self, _diff: &str, _n: usize) -> Result<Vec<RecentCommit>, AcpError> {
        Ok(Vec::new())
    }
}

/// [`MessageGenerator`] with a canned answer.
pub struct StubGenerator {
    result: Result<String, AcpError>,
    calls: AtomicUsize,
    interrupt: Option<CancellationToken>,
}

impl StubGenerator {
    pub fn returning(message: &str) -> Self {
        Self {
            result: Ok(message.to_string()),
            calls: AtomicUsize::new(0),
            interrupt: None,
        }
    }

    pub fn failing(error: AcpError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
            interrupt: None,
        }
    }

    /// Simulates Ctrl-C arriving while the model is thinking.
    pub fn interrupting(token: CancellationToken) -> Self {
        Self {
            result: Err(AcpError::cancelled()),
            calls: AtomicUsize::new(0),
            interrupt: Some(token),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageGenerator for StubGenerator {
    async fn generate(
        &self,
        _config: &Config,
        _vcs: &dyn VcsOps,
        _ui: &dyn UserInteraction,
    ) -> Result<String, AcpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref token) = self.interrupt {
            token.cancel();
        }
        self.result.clone()
    }
}

/// Config for a non-interactive run with a message given up front.
pub fn manual_config(message: &str) -> Config {
    Config {
        message: Some(message.to_string()),
        remote: "origin".to_string(),
        ..Config::default()
    }
}

/// Config for an AI-driven run.
pub fn ai_config() -> Config {
    let mut config = Config {
        remote: "origin".to_string(),
        ..Config::default()
    };
    config.ai.enabled = true;
    config
}

