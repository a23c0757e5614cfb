//! Pull request description building and creation.

use std::path::Path;

use git2::Repository;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ai::{AiClient, ChatMessage, ClientConfig, TerminalProgress};
use crate::config::Settings;
use crate::error::AcpError;
use crate::git::repo::{self, NameStatus};
use crate::github::{NewPullRequest, create_pull_request, get_github_token, parse_github_remote};

/// Diff characters sent to the model.
pub const MAX_PR_DIFF_CHARS: usize = 10_000;

const PR_SYSTEM_PROMPT: &str = r#"You are an expert developer who writes pull request descriptions.
Write the description in Markdown using exactly this template:

# {{ Title that summarizes the changes (5-10 words) }}

## Summary

{{ A paragraph describing what changed and why }}

## Key Changes

### Added

{{ Key functional additions and their impact }}

### Modified

{{ Key functional modifications and their impact }}

### Deleted

{{ Key removals and their impact }}

## Additional Notes

{{ Anything reviewers should know }}

Output only the pull request description. No commentary."#;

/// Options for the `pr` subcommand.
#[derive(Debug, Clone, Default)]
pub struct PrOptions {
    /// Defaults to the current branch.
    pub source: Option<String>,
    /// Defaults to `Settings::default_branch`.
    pub target: Option<String>,
    pub use_ai: bool,
    pub draft: bool,
    pub dry_run: bool,
}

/// Commits and changes between two branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrData {
    pub source: String,
    pub target: String,
    /// Commit subjects, oldest first.
    pub commits: Vec<String>,
    pub diff: String,
    pub files: NameStatus,
}

/// Title and markdown body of a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrDraft {
    pub title: String,
    pub body: String,
}

/// Read commits and diff for `target..source`.
pub fn gather_pr_data(repo: &Repository, source: &str, target: &str) -> Result<PrData, AcpError> {
    let commits = repo::branch_commit_subjects(repo, target, source)?;
    if commits.is_empty() {
        return Err(AcpError::git(format!(
            "No commits between {} and {}.",
            target, source
        ))
        .with_suggestion(format!("Commit your changes on {} first", source)));
    }

    let (diff, files) = repo::branch_diff(repo, target, source)?;
    debug!(
        "PR data: {} commits, {} added, {} modified, {} deleted",
        commits.len(),
        files.added.len(),
        files.modified.len(),
        files.deleted.len()
    );

    Ok(PrData {
        source: source.to_string(),
        target: target.to_string(),
        commits,
        diff,
        files,
    })
}

/// Title used without AI.
pub fn default_title(commits: &[String]) -> String {
    match commits.first() {
        Some(subject) if !subject.trim().is_empty() => format!("PR: {}", subject.trim()),
        _ => "Pull Request".to_string(),
    }
}

fn file_list(files: &[String]) -> String {
    if files.is_empty() {
        return "None".to_string();
    }
    files
        .iter()
        .map(|f| format!("- `{}`", f))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Markdown body built from commits and file lists.
pub fn build_pr_markdown(data: &PrData) -> String {
    let commits = data
        .commits
        .iter()
        .map(|c| format!("- {}", c))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "## Summary\n\nMerge `{source}` into `{target}` ({count} commit(s)).\n\n\
         ## Commits\n\n{commits}\n\n\
         ## Files Changed\n\n\
         ### Added\n\n{added}\n\n\
         ### Modified\n\n{modified}\n\n\
         ### Deleted\n\n{deleted}\n",
        source = data.source,
        target = data.target,
        count = data.commits.len(),
        commits = commits,
        added = file_list(&data.files.added),
        modified = file_list(&data.files.modified),
        deleted = file_list(&data.files.deleted),
    )
}

/// Draft without AI.
pub fn default_draft(data: &PrData) -> PrDraft {
    PrDraft {
        title: default_title(&data.commits),
        body: build_pr_markdown(data),
    }
}

/// Drop markdown fence lines around the model's output.
pub fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Split generated markdown into its `# Title` heading and the rest.
///
/// Falls back to `fallback_title` when no top-level heading exists.
pub fn split_title(markdown: &str, fallback_title: &str) -> PrDraft {
    let cleaned = strip_code_fences(markdown);
    let mut lines = cleaned.lines();

    let title = lines
        .by_ref()
        .map(str::trim)
        .find(|line| !line.is_empty());

    match title.and_then(|line| line.strip_prefix("# ")) {
        Some(title) => {
            let title = title
                .trim()
                .trim_matches(|c| c == '"' || c == '\'' || c == '`')
                .to_string();
            let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
            PrDraft { title, body }
        }
        None => PrDraft {
            title: fallback_title.to_string(),
            body: cleaned,
        },
    }
}

fn build_pr_prompt(data: &PrData) -> String {
    let commits = data
        .commits
        .iter()
        .map(|c| format!("- {}", c))
        .collect::<Vec<_>>()
        .join("\n");

    let overview = if data.diff.is_empty() {
        "# Note: No diff information provided for analysis".to_string()
    } else {
        let diff: String = data.diff.chars().take(MAX_PR_DIFF_CHARS).collect();
        format!("## Overview of changes to analyze\n\n{}", diff)
    };

    format!(
        "Create a concise pull request description by analyzing the below information:\n\n\
         ## Commit messages to analyze\n\n{}\n\n{}\n",
        commits, overview
    )
}

/// Draft a description with one chat request.
pub async fn generate_pr_draft(client: &AiClient, data: &PrData) -> Result<PrDraft, AcpError> {
    let progress = TerminalProgress::new("Generating pull request");
    let markdown = client
        .chat_completion(
            vec![
                ChatMessage::system(PR_SYSTEM_PROMPT),
                ChatMessage::user(build_pr_prompt(data)),
            ],
            &progress,
        )
        .await
        .map_err(|e| e.with_context("Failed to generate pull request description"))?;

    Ok(split_title(&markdown, &default_title(&data.commits)))
}

/// Build a pull request for `workdir` and open it on GitHub.
pub async fn run_pr(
    options: PrOptions,
    settings: &Settings,
    workdir: &Path,
    cancel: CancellationToken,
) -> Result<(), AcpError> {
    let repo = repo::open(workdir)?;

    let source = match options.source {
        Some(source) => source,
        None => repo::current_branch(&repo)?,
    };
    let target = options
        .target
        .unwrap_or_else(|| settings.default_branch.clone());

    if source == target {
        return Err(AcpError::config(format!(
            "Source and target branch are both '{}'.",
            source
        ))
        .with_suggestion("Pass --source or --target to pick different branches"));
    }

    println!("Preparing pull request: {} -> {}", source, target);
    let data = gather_pr_data(&repo, &source, &target)?;

    let draft = if options.use_ai {
        let client = AiClient::new(ClientConfig::for_pr(settings), cancel)?;
        generate_pr_draft(&client, &data).await?
    } else {
        default_draft(&data)
    };

    println!();
    println!("# {}", draft.title);
    println!();
    println!("{}", draft.body);

    if options.dry_run {
        println!();
        println!("Dry run complete. No pull request created.");
        return Ok(());
    }

    let remote_url = repo
        .find_remote(&settings.default_remote)
        .ok()
        .and_then(|r| r.url().map(str::to_string))
        .ok_or_else(|| {
            AcpError::git(format!("Remote '{}' not found.", settings.default_remote))
                .with_suggestion("Check your remote with 'git remote -v'.")
        })?;
    let (owner, repo_name) = parse_github_remote(&remote_url)?;
    let token = get_github_token()?;

    let created = create_pull_request(
        &token,
        &NewPullRequest {
            owner,
            repo: repo_name,
            title: draft.title,
            body: draft.body,
            head: source,
            base: target,
            draft: options.draft,
        },
    )
    .await?;

    println!();
    println!("  [DONE] Pull request #{} created: {}", created.number, created.url);
    Ok(())
}
