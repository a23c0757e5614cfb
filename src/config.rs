//! Runtime configuration: per-invocation `Config` and environment `Settings`.
//!
//! Settings are read from `GIT_ACP_*` environment variables after loading
//! `~/.config/git-acp/.env` (already-set variables win). Invalid values log a
//! warning and fall back to the default.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::AcpError;

pub const DEFAULT_AI_MODEL: &str = "mevatron/diffsense:1.5b";
pub const DEFAULT_PR_AI_MODEL: &str = "qwen2.5:3b-instruct";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_FALLBACK_BASE_URL: &str = "http://127.0.0.1:11434/v1";
pub const DEFAULT_API_KEY: &str = "ollama";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const MIN_TIMEOUT_SECS: u64 = 10;
pub const MAX_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_NUM_RECENT_COMMITS: usize = 3;
pub const DEFAULT_NUM_RELATED_COMMITS: usize = 3;

const MODEL_ENV_VAR: &str = "GIT_ACP_AI_MODEL";
const PR_MODEL_ENV_VAR: &str = "GIT_ACP_PR_AI_MODEL";
const TEMPERATURE_ENV_VAR: &str = "GIT_ACP_TEMPERATURE";
const BASE_URL_ENV_VAR: &str = "GIT_ACP_BASE_URL";
const FALLBACK_BASE_URL_ENV_VAR: &str = "GIT_ACP_FALLBACK_BASE_URL";
const API_KEY_ENV_VAR: &str = "GIT_ACP_API_KEY";
const PROMPT_TYPE_ENV_VAR: &str = "GIT_ACP_PROMPT_TYPE";
pub const TIMEOUT_ENV_VAR: &str = "GIT_ACP_AI_TIMEOUT";
const BRANCH_ENV_VAR: &str = "GIT_ACP_DEFAULT_BRANCH";
const REMOTE_ENV_VAR: &str = "GIT_ACP_DEFAULT_REMOTE";
const RECENT_COMMITS_ENV_VAR: &str = "GIT_ACP_NUM_RECENT_COMMITS";
const RELATED_COMMITS_ENV_VAR: &str = "GIT_ACP_NUM_RELATED_COMMITS";

/// How much prompt detail to send to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptType {
    Simple,
    #[default]
    Advanced,
}

impl FromStr for PromptType {
    type Err = AcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(PromptType::Simple),
            "advanced" => Ok(PromptType::Advanced),
            other => Err(AcpError::config(format!("Invalid prompt type: {}", other))
                .with_suggestion("Valid prompt types are: simple, advanced")),
        }
    }
}

impl fmt::Display for PromptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptType::Simple => write!(f, "simple"),
            PromptType::Advanced => write!(f, "advanced"),
        }
    }
}

/// Which repository context accompanies the diff in the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextPolicy {
    /// Diff plus recent and related commit history.
    #[default]
    Full,
    /// The diff alone.
    DiffOnly,
}

impl FromStr for ContextPolicy {
    type Err = AcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(ContextPolicy::Full),
            "diff" | "diff-only" => Ok(ContextPolicy::DiffOnly),
            other => Err(AcpError::config(format!("Invalid context type: {}", other))
                .with_suggestion("Valid context types are: full, diff")),
        }
    }
}

/// AI options for a single workflow run.
#[derive(Debug, Clone, Default)]
pub struct AiConfig {
    pub enabled: bool,
    pub prompt_type: PromptType,
    pub context: ContextPolicy,
    /// Overrides `Settings::model`.
    pub model: Option<String>,
    /// Context-window size, only sent to loopback endpoints.
    pub num_ctx: Option<u32>,
    /// Offer to edit the generated draft before using it.
    pub interactive: bool,
    pub verbose: bool,
}

/// Options for one workflow run.
///
/// Each auto-group batch works on its own clone.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Files to stage. `None` means ask the user.
    pub files: Option<Vec<String>>,
    /// Files were named explicitly (CLI `-a` or an auto-group batch).
    pub files_from_cli: bool,
    pub message: Option<String>,
    pub branch: Option<String>,
    pub remote: String,
    /// Raw category override, validated by the workflow.
    pub category: Option<String>,
    pub ai: AiConfig,
    pub skip_confirmation: bool,
    pub dry_run: bool,
    pub verbose: bool,
}

impl Config {
    /// Copy of this config scoped to one batch of files.
    pub fn for_batch(&self, files: Vec<String>) -> Self {
        let mut config = self.clone();
        config.files = Some(files);
        config.files_from_cli = true;
        config
    }

    /// True when the user asked for specific files rather than "everything".
    pub fn has_explicit_files(&self) -> bool {
        if self.files_from_cli {
            return true;
        }
        match self.files {
            Some(ref files) => !files.is_empty() && files.iter().any(|f| f != "."),
            None => false,
        }
    }
}

/// Process-wide settings read once from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub model: String,
    pub pr_model: String,
    pub temperature: f32,
    pub base_url: String,
    pub fallback_base_url: String,
    pub api_key: String,
    pub prompt_type: PromptType,
    pub timeout: Duration,
    pub default_branch: String,
    pub default_remote: String,
    pub num_recent_commits: usize,
    pub num_related_commits: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_AI_MODEL.to_string(),
            pr_model: DEFAULT_PR_AI_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            base_url: DEFAULT_BASE_URL.to_string(),
            fallback_base_url: DEFAULT_FALLBACK_BASE_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            prompt_type: PromptType::Advanced,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            default_branch: DEFAULT_BRANCH.to_string(),
            default_remote: DEFAULT_REMOTE.to_string(),
            num_recent_commits: DEFAULT_NUM_RECENT_COMMITS,
            num_related_commits: DEFAULT_NUM_RELATED_COMMITS,
        }
    }
}

impl Settings {
    /// Load `~/.config/git-acp/.env`, then read settings from the environment.
    pub fn load() -> Self {
        load_env_file();
        Self::from_env()
    }

    /// Read settings from the environment only.
    pub fn from_env() -> Self {
        Self {
            model: env_string(MODEL_ENV_VAR, DEFAULT_AI_MODEL),
            pr_model: env_string(PR_MODEL_ENV_VAR, DEFAULT_PR_AI_MODEL),
            temperature: env_parsed(TEMPERATURE_ENV_VAR, DEFAULT_TEMPERATURE),
            base_url: env_string(BASE_URL_ENV_VAR, DEFAULT_BASE_URL),
            fallback_base_url: env_string(FALLBACK_BASE_URL_ENV_VAR, DEFAULT_FALLBACK_BASE_URL),
            api_key: env_string(API_KEY_ENV_VAR, DEFAULT_API_KEY),
            prompt_type: env_parsed(PROMPT_TYPE_ENV_VAR, PromptType::Advanced),
            timeout: get_timeout(),
            default_branch: env_string(BRANCH_ENV_VAR, DEFAULT_BRANCH),
            default_remote: env_string(REMOTE_ENV_VAR, DEFAULT_REMOTE),
            num_recent_commits: env_parsed(RECENT_COMMITS_ENV_VAR, DEFAULT_NUM_RECENT_COMMITS),
            num_related_commits: env_parsed(RELATED_COMMITS_ENV_VAR, DEFAULT_NUM_RELATED_COMMITS),
        }
    }
}

/// Path of the user-level `.env` file, if a home directory is known.
pub fn env_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("git-acp").join(".env"))
}

fn load_env_file() {
    let Some(path) = env_file_path() else {
        return;
    };
    if !path.exists() {
        return;
    }
    match dotenvy::from_path(&path) {
        Ok(()) => debug!("Loaded settings from {}", path.display()),
        Err(e) => warn!("Failed to load {}: {}", path.display(), e),
    }
}

fn env_string(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

fn env_parsed<T>(name: &str, default: T) -> T
where
    T: FromStr + fmt::Display,
{
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => match v.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Invalid {} value '{}', using default {}", name, v, default);
                default
            }
        },
        _ => default,
    }
}

/// AI request timeout, clamped to 10..=300 seconds.
fn get_timeout() -> Duration {
    let secs: f64 = env_parsed(TIMEOUT_ENV_VAR, DEFAULT_TIMEOUT_SECS as f64);
    let clamped = if !secs.is_finite() || secs < MIN_TIMEOUT_SECS as f64 {
        warn!(
            "{} of {}s is too low, using minimum {}s",
            TIMEOUT_ENV_VAR, secs, MIN_TIMEOUT_SECS
        );
        MIN_TIMEOUT_SECS as f64
    } else if secs > MAX_TIMEOUT_SECS as f64 {
        warn!(
            "{} of {}s is too high, using maximum {}s",
            TIMEOUT_ENV_VAR, secs, MAX_TIMEOUT_SECS
        );
        MAX_TIMEOUT_SECS as f64
    } else {
        secs
    };
    Duration::from_secs_f64(clamped)
}
