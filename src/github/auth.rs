//! GitHub token discovery.
//!
//! Lookup order:
//! 1. `gh auth token` (gh CLI)
//! 2. `GITHUB_TOKEN` env var
//! 3. `GH_TOKEN` env var

use std::env;
use std::process::Command;

use tracing::debug;

use crate::error::AcpError;

const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Get a GitHub token from the gh CLI or the environment.
pub fn get_github_token() -> Result<String, AcpError> {
    if let Some(token) = get_token_from_gh_cli() {
        debug!("Using GitHub token from gh CLI");
        return Ok(token);
    }

    token_from_env().ok_or_else(|| {
        AcpError::github("GitHub token not found.").with_suggestion(
            "Run 'gh auth login', or set GITHUB_TOKEN (or GH_TOKEN) in your environment",
        )
    })
}

/// First non-empty token among the supported env vars.
fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS.iter().find_map(|name| {
        env::var(name)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

fn get_token_from_gh_cli() -> Option<String> {
    which::which("gh").ok()?;

    let status = Command::new("gh").args(["auth", "status"]).output().ok()?;
    if !status.status.success() {
        return None;
    }

    let output = Command::new("gh").args(["auth", "token"]).output().ok()?;
    if !output.status.success() {
        return None;
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!token.is_empty()).then_some(token)
}
