//! git-acp - stage, describe, classify, commit and push git changes.
//!
//! # Overview
//!
//! git-acp walks one commit through a fixed workflow: pick files, stage them,
//! draft a message (optionally with a local Ollama model), classify the
//! change into a conventional commit type, confirm, commit and push. Any
//! exit before the commit step unstages what it staged. An auto-group mode
//! splits the working tree into related batches and commits each on its own,
//! and a `pr` subcommand drafts and opens GitHub pull requests.

pub mod ai;
pub mod commit;
pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod pr;
pub mod workflow;

// Re-export commonly used types
pub use commit::{Category, classify, format_commit_message, group_changed_files};
pub use config::{Config, Settings};
pub use error::{AcpError, ErrorKind};
pub use git::{DiffKind, Git, VcsOps};
pub use workflow::{Outcome, UserInteraction, Workflow, run_auto_group};
