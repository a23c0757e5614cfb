//! Final commit message layout.

use super::category::Category;

/// Prefix `message` with the category code.
///
/// The first line becomes the title and the remaining lines the body:
/// `"<code>: <title>\n\n<body>"`. Without a body only the title line is
/// returned.
pub fn format_commit_message(category: Category, message: &str) -> String {
    let mut lines = message.trim().lines();
    let title = lines.next().unwrap_or_default().trim();
    let body = lines.collect::<Vec<_>>().join("\n");
    let body = body.trim();

    let formatted = if body.is_empty() {
        format!("{}: {}", category.code(), title)
    } else {
        format!("{}: {}\n\n{}", category.code(), title, body)
    };

    formatted.trim_end().to_string()
}
