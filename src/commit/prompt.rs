//! Prompt construction for AI-generated commit messages.

use crate::git::RecentCommit;

/// Type used when history shows no conventional commits.
pub const DEFAULT_COMMIT_TYPE: &str = "feat";

/// System prompt for the advanced prompt type.
pub const ADVANCED_SYSTEM_PROMPT: &str = r#"# IDENTITY AND PURPOSE

Generate clear, concise commit messages following the conventional commit format. Commit messages should make project history easy to track and review.

## RULES

- Format: `<type>[optional scope]: <description>`.
- Be specific about changes and why they were made.
- Reference related work if applicable.
- Keep messages concise and in present tense.
- Highlight the value of the change.
- Include scope if relevant.
- Add a `BREAKING CHANGE` footer if needed.

## COMMIT TYPES

- `feat`: New feature.
- `fix`: Bug fix.
- `refactor`: Code restructure without behavior change.
- `perf`: Performance improvement.
- `style`: Formatting changes.
- `test`: Add or correct tests.
- `docs`: Documentation updates.
- `build`: Build system updates.
- `ops`: Operational changes.
- `chore`: Miscellaneous updates.

## OUTPUT FORMAT

- Limit the subject to 50 characters.
- Capitalize the subject.
- No period at the end of the subject.
- Separate subject and body with a blank line.
- Use imperative mood.
- Wrap the body at 72 characters.
- Explain what and why in the body if needed."#;

/// System prompt for the simple prompt type.
pub const SIMPLE_SYSTEM_PROMPT: &str = r#"# IDENTITY AND PURPOSE

You generate commit messages using the conventional format: `type: description`.
Messages must be specific, concise, and in present tense.

## STEPS

- Choose a type (feat, fix, docs, refactor, test, chore).
- Describe the change clearly and briefly.

## OUTPUT INSTRUCTIONS

- Capitalize the subject.
- Limit the subject to 50 characters, no period.
- Separate subject and body with a blank line.
- Use the imperative mood.
- Wrap body text at 72 characters.
- Explain what and why in the body."#;

/// Repository context sent alongside the diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitContext {
    /// Staged diff, or the unstaged diff when nothing is staged.
    pub changes: String,
    pub recent_commits: Vec<RecentCommit>,
    pub related_commits: Vec<RecentCommit>,
    /// Most frequent conventional type in recent history.
    pub most_used_type: Option<String>,
}

/// Build the user prompt with history context.
pub fn build_advanced_prompt(context: &CommitContext) -> String {
    let common_type = context
        .most_used_type
        .as_deref()
        .unwrap_or(DEFAULT_COMMIT_TYPE);

    format!(
        r#"Generate a concise and descriptive commit message for the following changes:

Changes to commit:
{changes}

Repository context:
- Most used commit type: {common_type}
- Recent commits:
{recent}

Related commits:
{related}

Requirements:
{requirements}
"#,
        changes = sanitize_diff(&context.changes),
        recent = messages_json(&context.recent_commits),
        related = messages_json(&context.related_commits),
        requirements = requirements(ADVANCED_SYSTEM_PROMPT),
    )
}

/// Build the user prompt from the diff alone.
pub fn build_simple_prompt(context: &CommitContext) -> String {
    format!(
        r#"Generate a concise and descriptive commit message for the following changes:

{changes}

Requirements:
{requirements}
"#,
        changes = sanitize_diff(&context.changes),
        requirements = requirements(SIMPLE_SYSTEM_PROMPT),
    )
}

/// Commit messages as a pretty-printed JSON array.
fn messages_json(commits: &[RecentCommit]) -> String {
    let messages: Vec<&str> = commits.iter().map(|c| c.message.as_str()).collect();
    serde_json::to_string_pretty(&messages).unwrap_or_else(|_| "[]".to_string())
}

/// System prompt minus its heading lines.
fn requirements(system_prompt: &str) -> String {
    system_prompt.lines().skip(2).collect::<Vec<_>>().join("\n")
}

/// Drop control characters other than newlines and tabs.
fn sanitize_diff(diff: &str) -> String {
    diff.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}
