//! Paths git-acp never offers for staging.

use std::sync::OnceLock;

use regex_lite::Regex;

/// Build artifacts, caches and local environment files.
const EXCLUDED_PATTERNS: &[&str] = &[
    r"(^|/)__pycache__(/|$)",
    r"\.py[cod]$",
    // Exact .env only; .env.example and friends are kept
    r"(^|/)\.env$",
    r"(^|/)\.venv(/|$)",
    r"(^|/)node_modules(/|$)",
];

fn patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        EXCLUDED_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// True if `path` matches an exclusion pattern.
pub fn is_excluded(path: &str) -> bool {
    patterns().iter().any(|re| re.is_match(path))
}
