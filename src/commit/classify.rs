//! Keyword heuristic that picks a category for pending changes.
//!
//! Patterns are checked in a fixed order and the first category with a
//! matching keyword wins. Docs comes before fix, so a README typo fix is
//! classified as docs.

use tracing::debug;

use crate::commit::category::Category;
use crate::error::{AcpError, ErrorKind};
use crate::git::{DiffKind, VcsOps};

/// Ordered `(category, keywords)` pairs. Order is significant.
pub const CATEGORY_PATTERNS: &[(Category, &[&str])] = &[
    (
        Category::Docs,
        &["docs/", ".md", "readme", "documentation", "license"],
    ),
    (Category::Test, &["test", ".test.", "_test", "test_"]),
    (
        Category::Style,
        &["style", "format", "whitespace", "lint", "prettier", "eslint"],
    ),
    (
        Category::Refactor,
        &["refactor", "restructure", "cleanup", "clean up", "reorganize"],
    ),
    (
        Category::Fix,
        &["fix", "bug", "patch", "issue", "error", "crash", "problem", "resolve"],
    ),
    (
        Category::Feat,
        &[
            "add",
            "new",
            "feature",
            "update",
            "introduce",
            "implement",
            "enhance",
            "create",
            "improve",
            "support",
        ],
    ),
];

/// Classify change content. Falls back to `Chore` when nothing matches.
pub fn classify(content: &str) -> Category {
    let lowered = content.to_lowercase();

    for (category, keywords) in CATEGORY_PATTERNS {
        if let Some(keyword) = keywords.iter().find(|k| lowered.contains(*k)) {
            debug!("Matched '{}' for {}", keyword, category);
            return *category;
        }
    }

    Category::Chore
}

/// Classify the staged diff, or the unstaged diff when nothing is staged.
///
/// No diff at all is an error rather than a silent `Chore`.
pub fn classify_changes(vcs: &dyn VcsOps) -> Result<Category, AcpError> {
    let mut diff = vcs.diff(DiffKind::Staged)?;
    if diff.trim().is_empty() {
        diff = vcs.diff(DiffKind::Unstaged)?;
    }

    if diff.trim().is_empty() {
        return Err(
            AcpError::new(ErrorKind::Classification, "No changes detected to classify.")
                .with_suggestion("Make sure you have staged or unstaged changes."),
        );
    }

    Ok(classify(&diff))
}
