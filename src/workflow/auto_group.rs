//! One commit per group of related changes.

use tracing::{debug, warn};

use crate::commit::{MessageGenerator, group_changed_files};
use crate::config::Config;
use crate::git::VcsOps;

use super::{Outcome, PanelStyle, UserInteraction, Workflow};

/// Group the working-tree changes and run one [`Workflow`] per batch.
///
/// Refuses to start when anything is already staged. Each batch gets its own
/// copy of `config` and the index is emptied after every batch. A failing
/// batch does not stop the rest.
pub async fn run_auto_group(
    config: &Config,
    vcs: &dyn VcsOps,
    ui: &dyn UserInteraction,
    generator: &dyn MessageGenerator,
    max_groups: Option<usize>,
) -> Outcome {
    match vcs.staged_files() {
        Ok(staged) if !staged.is_empty() => {
            ui.print_error(
                &format!(
                    "Auto-group needs an empty staging area, but {} file(s) are already staged.",
                    staged.len()
                ),
                Some("Commit or unstage them first (git reset), then run again."),
                "Staged Changes Present",
            );
            return Outcome::Failed;
        }
        Ok(_) => {}
        Err(e) => {
            ui.print_error(&e.to_string(), None, "Auto-group Failed");
            return Outcome::Failed;
        }
    }

    let changed = match vcs.changed_files() {
        Ok(changed) => changed,
        Err(e) => {
            ui.print_error(&e.to_string(), None, "Auto-group Failed");
            return Outcome::Failed;
        }
    };

    if changed.is_empty() {
        ui.print_panel(
            "No changes detected in the repository. Nothing to do.",
            "No Changes",
            PanelStyle::Warning,
        );
        return Outcome::NothingToDo;
    }

    let batches = group_changed_files(&changed, max_groups);
    let total = batches.len();
    ui.print_message(&format!(
        "Auto-grouping {} file(s) into {} commit(s)",
        changed.len(),
        total
    ));

    let mut outcomes = Vec::with_capacity(total);
    for (index, batch) in batches.into_iter().enumerate() {
        ui.print_message(&format!(
            "── Group {}/{}: {} ──",
            index + 1,
            total,
            batch.join(", ")
        ));

        let outcome = Workflow::new(config.for_batch(batch), vcs, ui, generator)
            .run()
            .await;
        debug!("Group {}/{} finished: {:?}", index + 1, total, outcome);

        if let Err(e) = vcs.unstage() {
            warn!("Failed to unstage after group {}: {}", index + 1, e);
        }
        outcomes.push(outcome);
    }

    summarize(&outcomes)
}

/// Failed wins, then Committed, then whatever the first batch did.
fn summarize(outcomes: &[Outcome]) -> Outcome {
    if outcomes.contains(&Outcome::Failed) {
        Outcome::Failed
    } else if outcomes.contains(&Outcome::Committed) {
        Outcome::Committed
    } else {
        outcomes.first().copied().unwrap_or(Outcome::NothingToDo)
    }
}
