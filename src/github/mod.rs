//! GitHub API operations using octocrab.

pub mod auth;
pub mod pr;

pub use auth::get_github_token;
pub use pr::{CreatedPullRequest, NewPullRequest, create_pull_request, parse_github_remote};
