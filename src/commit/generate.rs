//! AI commit message generation.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ai::{AiClient, ChatMessage, ChatTransport, ClientConfig, HttpTransport, TerminalProgress};
use crate::config::{Config, ContextPolicy, PromptType, Settings};
use crate::error::AcpError;
use crate::git::{DiffKind, VcsOps};
use crate::workflow::UserInteraction;

use super::prompt::{
    ADVANCED_SYSTEM_PROMPT, CommitContext, SIMPLE_SYSTEM_PROMPT, build_advanced_prompt,
    build_simple_prompt,
};

/// Produces a draft commit message (without the category prefix).
#[async_trait]
pub trait MessageGenerator: Send + Sync {
    async fn generate(
        &self,
        config: &Config,
        vcs: &dyn VcsOps,
        ui: &dyn UserInteraction,
    ) -> Result<String, AcpError>;
}

/// Generates messages through the chat endpoint.
pub struct AiMessageGenerator {
    settings: Settings,
    transport: Arc<dyn ChatTransport>,
    cancel: CancellationToken,
}

impl AiMessageGenerator {
    pub fn new(settings: Settings, cancel: CancellationToken) -> Result<Self, AcpError> {
        let transport = HttpTransport::new(settings.api_key.clone(), settings.timeout)?;
        Ok(Self::with_transport(settings, Arc::new(transport), cancel))
    }

    pub fn with_transport(
        settings: Settings,
        transport: Arc<dyn ChatTransport>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            settings,
            transport,
            cancel,
        }
    }
}

#[async_trait]
impl MessageGenerator for AiMessageGenerator {
    async fn generate(
        &self,
        config: &Config,
        vcs: &dyn VcsOps,
        ui: &dyn UserInteraction,
    ) -> Result<String, AcpError> {
        let context = gather_context(vcs, &self.settings, config.ai.context)?;

        let advanced = config.ai.prompt_type == PromptType::Advanced
            && config.ai.context == ContextPolicy::Full;
        let (system, prompt) = if advanced {
            (ADVANCED_SYSTEM_PROMPT, build_advanced_prompt(&context))
        } else {
            (SIMPLE_SYSTEM_PROMPT, build_simple_prompt(&context))
        };

        if config.ai.verbose {
            debug!("Commit prompt ({} chars):\n{}", prompt.len(), prompt);
        }

        let client = AiClient::with_transport(
            ClientConfig::for_commits(&self.settings, &config.ai),
            Arc::clone(&self.transport),
            self.cancel.clone(),
        )?;
        let progress = TerminalProgress::new("Generating commit message");
        let message = client
            .chat_completion(
                vec![ChatMessage::system(system), ChatMessage::user(prompt)],
                &progress,
            )
            .await?;

        if config.ai.interactive {
            return ui.edit_message(message);
        }
        Ok(message)
    }
}

/// Diff and history sent to the model.
///
/// Uses the staged diff, or the unstaged diff when nothing is staged. History
/// is only read with [`ContextPolicy::Full`].
pub fn gather_context(
    vcs: &dyn VcsOps,
    settings: &Settings,
    policy: ContextPolicy,
) -> Result<CommitContext, AcpError> {
    let mut changes = vcs.diff(DiffKind::Staged)?;
    if changes.trim().is_empty() {
        changes = vcs.diff(DiffKind::Unstaged)?;
    }

    if policy == ContextPolicy::DiffOnly {
        return Ok(CommitContext {
            changes,
            ..Default::default()
        });
    }

    let recent_commits = vcs.recent_commits(settings.num_recent_commits)?;
    let related_commits = vcs.related_commits(&changes, settings.num_related_commits)?;
    let most_used_type = crate::git::repo::most_used_type(&recent_commits);
    debug!(
        "Context: {} recent, {} related, most used type {:?}",
        recent_commits.len(),
        related_commits.len(),
        most_used_type
    );

    Ok(CommitContext {
        changes,
        recent_commits,
        related_commits,
        most_used_type,
    })
}
