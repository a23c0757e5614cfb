//! Removal of `<think>` reasoning blocks from model output.

use std::sync::OnceLock;

use regex_lite::Regex;

fn block_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<think>.*?</think>").ok())
        .as_ref()
}

fn open_tag() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<think>").ok()).as_ref()
}

fn close_tag() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</think>").ok()).as_ref()
}

/// Strip reasoning blocks and return the trimmed answer.
///
/// Handles closed blocks, a trailing block the model never closed, and a
/// leading block whose opening tag was dropped.
pub fn strip_thinking(text: &str) -> String {
    let mut cleaned = match block_regex() {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    };

    // Match offsets come from `cleaned` itself, so slicing stays on char boundaries
    if let Some(m) = close_tag().and_then(|re| re.find(&cleaned)) {
        cleaned = cleaned[m.end()..].to_string();
    }

    if let Some(m) = open_tag().and_then(|re| re.find(&cleaned)) {
        cleaned.truncate(m.start());
    }

    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_tags_is_trimmed_only() {
        assert_eq!(strip_thinking("  feat: add x\n"), "feat: add x");
    }

    #[test]
    fn test_removes_closed_block() {
        let text = "<think>\nThe user changed a parser.\n</think>\n\nfix: handle empty input";
        assert_eq!(strip_thinking(text), "fix: handle empty input");
    }

    #[test]
    fn test_removes_multiple_blocks_case_insensitive() {
        let text = "<THINK>a</THINK>feat: one<think>b</think>";
        assert_eq!(strip_thinking(text), "feat: one");
    }

    #[test]
    fn test_unclosed_block_is_cut() {
        assert_eq!(strip_thinking("docs: update readme\n<think>hmm"), "docs: update readme");
    }

    #[test]
    fn test_missing_open_tag() {
        assert_eq!(strip_thinking("reasoning here</think>chore: tidy"), "chore: tidy");
    }

    #[test]
    fn test_only_thinking_is_empty() {
        assert_eq!(strip_thinking("<think>nothing useful</think>"), "");
    }

    #[test]
    fn test_tags_after_non_ascii_text() {
        // Lowercasing 'Ⱥ' and 'İ' changes their byte length
        assert_eq!(strip_thinking("ȺȺȺȺ</think>ok"), "ok");
        assert_eq!(strip_thinking("ȺȺȺȺ</think>fix: handle input"), "fix: handle input");
        assert_eq!(strip_thinking("İİ feat: add x<think>dangling"), "İİ feat: add x");
        assert_eq!(strip_thinking("<think>ünïcödé</think>docs: Übersicht"), "docs: Übersicht");
    }
}
