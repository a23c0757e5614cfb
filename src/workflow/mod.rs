//! The stage → describe → classify → confirm → commit → push workflow.
//!
//! [`Workflow::run`] drives one commit. Every exit taken before the commit
//! step empties the staging area exactly once, so an abandoned run leaves
//! the index as it found it (minus anything that was already staged).

pub mod auto_group;
pub mod interaction;

use std::str::FromStr;

use tracing::{debug, warn};

use crate::commit::{Category, MessageGenerator, classify_changes, format_commit_message};
use crate::config::Config;
use crate::error::AcpError;
use crate::git::VcsOps;

pub use auto_group::run_auto_group;
pub use interaction::{
    PanelStyle, RecordedPanel, ScriptedInteraction, TerminalInteraction, UserInteraction,
};

const CANCELLED_MESSAGE: &str = "Operation cancelled by user.";

/// How a workflow run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Committed,
    NothingToDo,
    Cancelled,
    DryRun,
    Failed,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Failed => 1,
            _ => 0,
        }
    }
}

/// Why a stage stopped the run.
#[derive(Debug)]
enum Exit {
    /// Already reported to the user.
    Handled(Outcome),
    /// Escaped the stage handlers; reported by `run`.
    Error(AcpError),
}

impl From<AcpError> for Exit {
    fn from(err: AcpError) -> Self {
        Exit::Error(err)
    }
}

/// One commit workflow over a [`Config`].
pub struct Workflow<'a> {
    config: Config,
    vcs: &'a dyn VcsOps,
    ui: &'a dyn UserInteraction,
    generator: &'a dyn MessageGenerator,
    commit_attempted: bool,
}

impl<'a> Workflow<'a> {
    pub fn new(
        config: Config,
        vcs: &'a dyn VcsOps,
        ui: &'a dyn UserInteraction,
        generator: &'a dyn MessageGenerator,
    ) -> Self {
        Self {
            config,
            vcs,
            ui,
            generator,
            commit_attempted: false,
        }
    }

    /// Run to completion. Failures are reported through the interaction port.
    pub async fn run(mut self) -> Outcome {
        let outcome = match self.drive().await {
            Ok(outcome) | Err(Exit::Handled(outcome)) => outcome,
            Err(Exit::Error(e)) if e.is_cancelled() => {
                self.ui
                    .print_panel(CANCELLED_MESSAGE, "Cancelled", PanelStyle::Warning);
                Outcome::Cancelled
            }
            Err(Exit::Error(e)) => {
                warn!("{} error escaped the workflow: {}", e.kind, describe(&e));
                let err = AcpError::unexpected(format!("An unexpected error occurred:\n{}", e))
                    .with_suggestion("Please report this issue if it persists.");
                self.ui
                    .print_error(&err.message, err.suggestion.as_deref(), "Unexpected Error");
                Outcome::Failed
            }
        };

        if !self.commit_attempted {
            self.rollback(outcome);
        }
        debug!("Workflow finished: {:?}", outcome);
        outcome
    }

    async fn drive(&mut self) -> Result<Outcome, Exit> {
        // ── Stage 1: File selection ──
        let files = self.select_files()?;

        // ── Stage 2: Branch detection ──
        let branch = self.detect_branch()?;

        // ── Stage 3: Staging ──
        self.stage(&files)?;

        // ── Stage 4: Commit message ──
        let message = self.acquire_message().await?;

        // ── Stage 5: Commit type ──
        let category = self.select_category()?;

        let formatted = format_commit_message(category, &message);

        // ── Stage 6: Confirmation ──
        self.confirm(&formatted)?;

        if self.config.dry_run {
            self.report_dry_run(&branch, &files, &formatted);
            return Ok(Outcome::DryRun);
        }

        // ── Stage 7: Commit and push ──
        self.commit_and_push(&branch, &formatted)
    }

    fn select_files(&mut self) -> Result<Vec<String>, Exit> {
        if self.config.has_explicit_files() {
            let files = self
                .config
                .files
                .clone()
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| vec![".".to_string()]);
            return Ok(files);
        }

        let changed = self
            .vcs
            .changed_files()
            .map_err(|e| self.fail(e, "Error during file selection", "Check file paths and try again.", "File Selection Failed"))?;

        if changed.is_empty() && self.config.skip_confirmation {
            self.ui.print_panel(
                "No changes detected in the repository. Nothing to do.",
                "No Changes",
                PanelStyle::Warning,
            );
            return Err(Exit::Handled(Outcome::NothingToDo));
        }

        let files = self.ui.select_files(&changed).map_err(|e| {
            if e.is_cancelled() {
                self.cancelled()
            } else {
                self.fail(e, "Error during file selection", "Check file paths and try again.", "File Selection Failed")
            }
        })?;
        self.config.files = Some(files.clone());
        Ok(files)
    }

    fn detect_branch(&mut self) -> Result<String, Exit> {
        if let Some(ref branch) = self.config.branch {
            return Ok(branch.clone());
        }

        let branch = self.vcs.current_branch().map_err(|e| {
            self.fail(
                e,
                "Error getting current branch",
                "Ensure you're in a git repository with a valid branch.",
                "Branch Detection Failed",
            )
        })?;
        self.config.branch = Some(branch.clone());
        Ok(branch)
    }

    fn stage(&self, files: &[String]) -> Result<(), Exit> {
        if self.config.files_from_cli {
            self.ui.print_message("Adding files:");
            for file in files {
                self.ui.print_message(&format!("  - {}", file));
            }
        }

        self.vcs.add_files(files).map_err(|e| {
            self.fail(
                e,
                "Error adding files",
                "Check file paths and repository permissions.",
                "Git Add Failed",
            )
        })?;

        if self.config.files_from_cli && self.vcs.staged_files()?.is_empty() {
            self.ui.print_panel(
                &format!(
                    "No actual changes were found in the files specified ({}). Nothing was staged.",
                    files.join(" ")
                ),
                "No Changes Staged",
                PanelStyle::Warning,
            );
            return Err(Exit::Handled(Outcome::NothingToDo));
        }
        Ok(())
    }

    async fn acquire_message(&self) -> Result<String, Exit> {
        if self.config.ai.enabled {
            match self.generator.generate(&self.config, self.vcs, self.ui).await {
                Ok(message) if !message.trim().is_empty() => return Ok(message),
                Ok(_) => {
                    self.ui.print_error(
                        "AI commit message generation failed:\nThe model returned an empty message.",
                        Some("Check Ollama server status and configuration."),
                        "AI Generation Failed",
                    );
                }
                Err(e) if e.is_cancelled() => return Err(e.into()),
                Err(e) => {
                    let suggestion = e
                        .suggestion
                        .clone()
                        .unwrap_or_else(|| "Check Ollama server status and configuration.".to_string());
                    self.ui.print_error(
                        &format!("AI commit message generation failed:\n{}", describe(&e)),
                        Some(&suggestion),
                        "AI Generation Failed",
                    );
                }
            }

            if !self
                .ui
                .confirm("Would you like to continue with a manual commit message?")?
            {
                return Err(Exit::Handled(Outcome::Failed));
            }
            return self.manual_message();
        }

        match self.config.message {
            Some(ref message) if !message.trim().is_empty() => Ok(message.clone()),
            _ => self.manual_message(),
        }
    }

    fn manual_message(&self) -> Result<String, Exit> {
        match self.ui.prompt_manual_message() {
            Some(message) if !message.trim().is_empty() => Ok(message),
            _ => {
                self.ui.print_error(
                    "No commit message provided.",
                    Some("Please specify a message with -m or use --ollama."),
                    "Missing Message",
                );
                Err(Exit::Handled(Outcome::Failed))
            }
        }
    }

    fn select_category(&self) -> Result<Category, Exit> {
        if let Some(ref raw) = self.config.category {
            let category = Category::from_str(raw).map_err(|e| {
                self.fail(
                    e,
                    "Invalid commit type specified",
                    "Use: feat, fix, docs, style, refactor, test, chore, revert.",
                    "Invalid Commit Type",
                )
            })?;
            self.ui
                .print_message(&format!("Using specified commit type: {}", category));
            return Ok(category);
        }

        self.ui.print_message("Analyzing changes to suggest commit type...");
        let suggested = classify_changes(self.vcs).map_err(|e| {
            self.fail(
                e,
                "Error determining commit type",
                "Check your changes or specify a commit type with -t.",
                "Commit Type Error",
            )
        })?;
        debug!("Suggested commit type: {}", suggested);

        let category = self
            .ui
            .select_category(suggested, &self.config)
            .map_err(|e| {
                if e.is_cancelled() {
                    self.cancelled()
                } else {
                    self.fail(
                        e,
                        "Error selecting commit type",
                        "Try again or specify a commit type with -t.",
                        "Commit Type Selection Failed",
                    )
                }
            })?;
        self.ui
            .print_message(&format!("Commit type selected: {}", category));
        Ok(category)
    }

    fn confirm(&self, formatted: &str) -> Result<(), Exit> {
        if self.config.skip_confirmation {
            if !self.config.dry_run {
                self.ui
                    .print_message(&format!("Auto-committing with message:\n{}", formatted));
            }
            return Ok(());
        }

        self.ui
            .print_message(&format!("Commit Message:\n{}", formatted));
        if !self.ui.confirm("Do you want to proceed?")? {
            return Err(self.cancelled());
        }
        Ok(())
    }

    fn report_dry_run(&self, branch: &str, files: &[String], formatted: &str) {
        self.ui
            .print_message("DRY RUN MODE - No changes will be committed");
        self.ui.print_message(&format!("Branch: {}", branch));
        self.ui
            .print_message(&format!("Remote: {}", self.config.remote));
        self.ui
            .print_message(&format!("Files: {}", files.join(", ")));
        self.ui
            .print_message(&format!("Would commit with message:\n{}", formatted));
    }

    fn commit_and_push(&mut self, branch: &str, formatted: &str) -> Result<Outcome, Exit> {
        self.commit_attempted = true;

        if let Err(e) = self.vcs.commit(formatted) {
            return Err(self.fail(
                e,
                "Error committing changes",
                "Check if there are changes to commit and try again.",
                "Commit Failed",
            ));
        }
        self.ui.print_message("  [DONE] Created commit");

        if let Err(e) = self.vcs.push(branch) {
            return Err(self.fail(
                e,
                "Error pushing changes",
                "Pull latest changes, resolve conflicts, and try again.",
                "Push Failed",
            ));
        }
        self.ui.print_message(&format!(
            "  [DONE] Pushed to {}/{}",
            self.config.remote, branch
        ));

        Ok(Outcome::Committed)
    }

    /// Report a failed stage. Cancellation passes through to `run`.
    fn fail(&self, err: AcpError, lead: &str, fallback_suggestion: &str, title: &str) -> Exit {
        if err.is_cancelled() {
            return Exit::Error(err);
        }
        let suggestion = err
            .suggestion
            .clone()
            .unwrap_or_else(|| fallback_suggestion.to_string());
        self.ui.print_error(
            &format!("{}:\n{}", lead, describe(&err)),
            Some(&suggestion),
            title,
        );
        Exit::Handled(Outcome::Failed)
    }

    fn cancelled(&self) -> Exit {
        self.ui
            .print_panel(CANCELLED_MESSAGE, "Cancelled", PanelStyle::Warning);
        Exit::Handled(Outcome::Cancelled)
    }

    fn rollback(&self, outcome: Outcome) {
        match self.vcs.unstage() {
            Ok(()) if outcome == Outcome::DryRun => {
                self.ui
                    .print_message("Files have been unstaged (dry-run cleanup)");
            }
            Ok(()) => debug!("Unstaged files after {:?}", outcome),
            Err(e) => warn!("Failed to unstage files: {}", e),
        }
    }
}

/// Error message with its context, without the suggestion.
fn describe(err: &AcpError) -> String {
    match err.context {
        Some(ref context) => format!("{}: {}", context, err.message),
        None => err.message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Outcome::Committed.exit_code(), 0);
        assert_eq!(Outcome::NothingToDo.exit_code(), 0);
        assert_eq!(Outcome::Cancelled.exit_code(), 0);
        assert_eq!(Outcome::DryRun.exit_code(), 0);
        assert_eq!(Outcome::Failed.exit_code(), 1);
    }

    #[test]
    fn test_describe_includes_context() {
        let err = AcpError::git("Push rejected.").with_context("Failed to push changes");
        assert_eq!(describe(&err), "Failed to push changes: Push rejected.");
        assert_eq!(describe(&AcpError::git("x")), "x");
    }
}
