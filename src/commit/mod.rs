//! Commit categories, classification, grouping and message generation.

pub mod category;
pub mod classify;
pub mod format;
pub mod generate;
pub mod grouping;
pub mod prompt;

pub use category::Category;
pub use classify::{classify, classify_changes};
pub use format::format_commit_message;
pub use generate::{AiMessageGenerator, MessageGenerator, gather_context};
pub use grouping::group_changed_files;
pub use prompt::CommitContext;
