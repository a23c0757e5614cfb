//! Read-only repository queries using git2.
//!
//! Status, diffs and history are read in-process. Anything that mutates the
//! repository goes through [`super::runner::GitRunner`] instead.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::{DateTime, TimeZone, Utc};
use git2::{
    Commit, Delta, Diff, DiffFormat, DiffOptions, ErrorCode, Repository, Sort, Status,
    StatusEntry, StatusOptions, Tree,
};
use regex_lite::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::AcpError;

use super::DiffKind;
use super::exclude::is_excluded;

/// Maximum characters of diff text handed to the classifier or the model.
pub const MAX_DIFF_LENGTH: usize = 30_000;

const CHANGED: Status = Status::INDEX_NEW
    .union(Status::INDEX_MODIFIED)
    .union(Status::INDEX_DELETED)
    .union(Status::INDEX_RENAMED)
    .union(Status::INDEX_TYPECHANGE)
    .union(Status::WT_NEW)
    .union(Status::WT_MODIFIED)
    .union(Status::WT_DELETED)
    .union(Status::WT_RENAMED)
    .union(Status::WT_TYPECHANGE)
    .union(Status::CONFLICTED);

const STAGED: Status = Status::INDEX_NEW
    .union(Status::INDEX_MODIFIED)
    .union(Status::INDEX_DELETED)
    .union(Status::INDEX_RENAMED)
    .union(Status::INDEX_TYPECHANGE);

/// A commit from recent history, as shown to the model.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecentCommit {
    pub hash: String,
    pub message: String,
    pub author: String,
    pub date: DateTime<Utc>,
}

impl RecentCommit {
    fn from_git2_commit(commit: &Commit<'_>) -> Self {
        let id = commit.id().to_string();
        let time = commit.time();
        Self {
            hash: id.chars().take(7).collect(),
            message: commit.summary().unwrap_or("").to_string(),
            author: commit.author().name().unwrap_or("").to_string(),
            date: Utc
                .timestamp_opt(time.seconds(), 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }
}

/// Files added, modified and deleted between two refs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameStatus {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

/// Open the repository containing `path`.
pub fn open(path: &std::path::Path) -> Result<Repository, AcpError> {
    Repository::discover(path).map_err(|e| {
        debug!("Failed to open repository at {}: {}", path.display(), e);
        AcpError::git("Not a git repository.").with_suggestion("Run 'git init' or check directory")
    })
}

/// Resolve the HEAD tree, `None` for a repository without commits.
fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, AcpError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Some(head_ref.peel_to_tree()?))
}

/// True once HEAD points at a commit.
pub fn has_commits(repo: &Repository) -> Result<bool, AcpError> {
    Ok(resolve_head_tree(repo)?.is_some())
}

/// Path of a status entry, using the new name for renames.
fn entry_path(entry: &StatusEntry<'_>) -> Option<String> {
    entry
        .index_to_workdir()
        .and_then(|d| d.new_file().path().map(|p| p.to_string_lossy().into_owned()))
        .or_else(|| {
            entry
                .head_to_index()
                .and_then(|d| d.new_file().path().map(|p| p.to_string_lossy().into_owned()))
        })
        .or_else(|| entry.path().map(str::to_string))
}

fn collect_status(repo: &Repository, wanted: Status) -> Result<BTreeSet<String>, AcpError> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .renames_head_to_index(true);

    let statuses = repo.statuses(Some(&mut opts))?;
    let mut files = BTreeSet::new();

    for entry in statuses.iter() {
        if !entry.status().intersects(wanted) {
            continue;
        }
        let Some(path) = entry_path(&entry) else {
            continue;
        };
        if is_excluded(&path) {
            debug!("Excluding {}", path);
            continue;
        }
        files.insert(path);
    }

    Ok(files)
}

/// Every changed path (staged, unstaged or untracked), minus exclusions.
pub fn changed_files(repo: &Repository) -> Result<BTreeSet<String>, AcpError> {
    collect_status(repo, CHANGED)
}

/// Paths currently staged in the index.
pub fn staged_files(repo: &Repository) -> Result<BTreeSet<String>, AcpError> {
    collect_status(repo, STAGED)
}

/// Name of the checked-out branch.
///
/// Works on a fresh repository with no commits. A detached HEAD is an error.
pub fn current_branch(repo: &Repository) -> Result<String, AcpError> {
    match repo.head() {
        Ok(head) => {
            if !head.is_branch() {
                return Err(AcpError::git("HEAD is detached; no current branch.")
                    .with_suggestion("Check out a branch or pass one with -b/--branch."));
            }
            head.shorthand()
                .map(str::to_string)
                .ok_or_else(|| AcpError::git("Branch name is not valid UTF-8."))
        }
        Err(e) if e.code() == ErrorCode::UnbornBranch => {
            let head = repo.find_reference("HEAD")?;
            head.symbolic_target()
                .and_then(|t| t.strip_prefix("refs/heads/"))
                .map(str::to_string)
                .ok_or_else(|| AcpError::git("Could not determine current branch."))
        }
        Err(e) => Err(AcpError::git(format!(
            "Could not determine current branch: {}",
            e.message()
        ))),
    }
}

/// Unified diff text for staged or unstaged changes, capped at
/// [`MAX_DIFF_LENGTH`].
pub fn diff_text(repo: &Repository, kind: DiffKind) -> Result<String, AcpError> {
    let diff = match kind {
        DiffKind::Staged => {
            let head_tree = resolve_head_tree(repo)?;
            repo.diff_tree_to_index(head_tree.as_ref(), None, None)?
        }
        DiffKind::Unstaged => {
            let mut opts = DiffOptions::new();
            opts.include_untracked(true)
                .recurse_untracked_dirs(true)
                .show_untracked_content(true);
            repo.diff_index_to_workdir(None, Some(&mut opts))?
        }
    };

    let (text, truncated) = render_patch(&diff);
    if truncated {
        debug!("{:?} diff truncated to {} chars", kind, MAX_DIFF_LENGTH);
    }
    Ok(text)
}

/// Render a diff as patch text, stopping at [`MAX_DIFF_LENGTH`].
fn render_patch(diff: &Diff<'_>) -> (String, bool) {
    let mut text = String::new();
    let mut truncated = false;

    if let Err(e) = diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let content = std::str::from_utf8(line.content()).unwrap_or("");

        if text.len() + content.len() + 1 > MAX_DIFF_LENGTH {
            truncated = true;
            return false;
        }

        let origin = line.origin();
        if origin == '+' || origin == '-' || origin == ' ' {
            text.push(origin);
        }
        text.push_str(content);
        true
    }) {
        // Returning false from the callback surfaces as a user error
        if !truncated {
            warn!("Failed to render diff text: {e}");
        }
    }

    (text, truncated)
}

/// The `n` most recent commits reachable from HEAD, newest first.
pub fn recent_commits(repo: &Repository, n: usize) -> Result<Vec<RecentCommit>, AcpError> {
    if n == 0 || !has_commits(repo)? {
        return Ok(Vec::new());
    }

    let mut revwalk = repo.revwalk()?;
    revwalk.push_head()?;
    revwalk.set_sorting(Sort::TIME)?;

    let mut commits = Vec::new();
    for oid in revwalk.take(n) {
        let commit = repo.find_commit(oid?)?;
        commits.push(RecentCommit::from_git2_commit(&commit));
    }
    Ok(commits)
}

/// Paths touched by a commit, compared with its first parent.
fn commit_files(repo: &Repository, commit: &Commit<'_>) -> Result<BTreeSet<String>, AcpError> {
    let tree = commit.tree()?;
    let parent_tree = match commit.parent(0) {
        Ok(parent) => Some(parent.tree()?),
        Err(_) => None,
    };
    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

    let mut files = BTreeSet::new();
    for delta in diff.deltas() {
        for file in [delta.old_file(), delta.new_file()] {
            if let Some(path) = file.path() {
                files.insert(path.to_string_lossy().into_owned());
            }
        }
    }
    Ok(files)
}

/// Paths named in the `--- a/` and `+++ b/` headers of a patch.
pub fn files_in_diff(diff: &str) -> BTreeSet<String> {
    diff.lines()
        .filter_map(|line| {
            line.strip_prefix("+++ b/")
                .or_else(|| line.strip_prefix("--- a/"))
        })
        .map(|path| path.trim().to_string())
        .filter(|path| !path.is_empty() && path != "/dev/null")
        .collect()
}

/// Up to `n` recent commits that touched a file in `diff`.
///
/// Searches the `2 * n` most recent commits.
pub fn related_commits(
    repo: &Repository,
    diff: &str,
    n: usize,
) -> Result<Vec<RecentCommit>, AcpError> {
    let current = files_in_diff(diff);
    if current.is_empty() || n == 0 || !has_commits(repo)? {
        return Ok(Vec::new());
    }

    let mut revwalk = repo.revwalk()?;
    revwalk.push_head()?;
    revwalk.set_sorting(Sort::TIME)?;

    let mut related = Vec::new();
    for oid in revwalk.take(n * 2) {
        let commit = repo.find_commit(oid?)?;
        let files = match commit_files(repo, &commit) {
            Ok(files) => files,
            Err(e) => {
                debug!("Skipping commit {}: {}", commit.id(), e);
                continue;
            }
        };
        if files.iter().any(|f| current.contains(f)) {
            related.push(RecentCommit::from_git2_commit(&commit));
            if related.len() >= n {
                break;
            }
        }
    }
    Ok(related)
}

fn conventional_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    // type(scope)!: description
    RE.get_or_init(|| Regex::new(r"^(\w+)(?:\(([^)]*)\))?!?:\s").ok())
        .as_ref()
}

/// Most frequent conventional commit type in `commits`.
///
/// Ties go to the type seen first. `None` when no commit is conventional.
pub fn most_used_type(commits: &[RecentCommit]) -> Option<String> {
    let re = conventional_regex()?;
    let mut counts: Vec<(String, usize)> = Vec::new();

    for commit in commits {
        let Some(caps) = re.captures(&commit.message) else {
            continue;
        };
        let Some(kind) = caps.get(1) else {
            continue;
        };
        let kind = kind.as_str().to_lowercase();
        match counts.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, count)) => *count += 1,
            None => counts.push((kind, 1)),
        }
    }

    let mut best: Option<(String, usize)> = None;
    for (kind, count) in counts {
        if best.as_ref().is_none_or(|(_, c)| count > *c) {
            best = Some((kind, count));
        }
    }
    best.map(|(kind, _)| kind)
}

fn resolve_commit<'r>(repo: &'r Repository, name: &str) -> Result<Commit<'r>, AcpError> {
    repo.revparse_single(name)
        .and_then(|obj| obj.peel_to_commit())
        .map_err(|_| {
            AcpError::git(format!("Branch not found: {}", name))
                .with_suggestion("Check the branch name with 'git branch -a'.")
        })
}

/// Subjects of commits on `source` that are not on `target`, oldest first.
pub fn branch_commit_subjects(
    repo: &Repository,
    target: &str,
    source: &str,
) -> Result<Vec<String>, AcpError> {
    let target_commit = resolve_commit(repo, target)?;
    let source_commit = resolve_commit(repo, source)?;

    let mut revwalk = repo.revwalk()?;
    revwalk.push(source_commit.id())?;
    revwalk.hide(target_commit.id())?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;

    let mut subjects = Vec::new();
    for oid in revwalk {
        let commit = repo.find_commit(oid?)?;
        subjects.push(commit.summary().unwrap_or("").to_string());
    }
    Ok(subjects)
}

/// Diff of `source` against its merge base with `target` (`target...source`).
pub fn branch_diff(
    repo: &Repository,
    target: &str,
    source: &str,
) -> Result<(String, NameStatus), AcpError> {
    let target_commit = resolve_commit(repo, target)?;
    let source_commit = resolve_commit(repo, source)?;
    let base_id = repo.merge_base(target_commit.id(), source_commit.id())?;
    let base_tree = repo.find_commit(base_id)?.tree()?;
    let source_tree = source_commit.tree()?;

    let diff = repo.diff_tree_to_tree(Some(&base_tree), Some(&source_tree), None)?;

    let mut changes = NameStatus::default();
    for delta in diff.deltas() {
        let path = delta
            .new_file()
            .path()
            .or_else(|| delta.old_file().path())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        match delta.status() {
            Delta::Added => changes.added.push(path),
            Delta::Deleted => changes.deleted.push(path),
            Delta::Modified | Delta::Renamed | Delta::Typechange => changes.modified.push(path),
            _ => {}
        }
    }

    let (text, _) = render_patch(&diff);
    Ok((text, changes))
}
