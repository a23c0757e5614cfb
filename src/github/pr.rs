//! Pull request creation via octocrab.

use octocrab::Octocrab;
use tracing::debug;

use crate::error::AcpError;

/// A pull request to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub owner: String,
    pub repo: String,
    pub title: String,
    pub body: String,
    /// Source branch.
    pub head: String,
    /// Target branch.
    pub base: String,
    pub draft: bool,
}

/// The pull request GitHub created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPullRequest {
    pub number: u64,
    pub url: String,
}

/// Open a pull request using a token.
pub async fn create_pull_request(
    token: &str,
    pr: &NewPullRequest,
) -> Result<CreatedPullRequest, AcpError> {
    let octocrab = Octocrab::builder()
        .personal_token(token.to_string())
        .build()
        .map_err(|e| AcpError::github(format!("Failed to build GitHub client: {}", e)))?;

    create_pull_request_with_client(&octocrab, pr).await
}

/// Open a pull request using a pre-configured octocrab client.
pub async fn create_pull_request_with_client(
    octocrab: &Octocrab,
    pr: &NewPullRequest,
) -> Result<CreatedPullRequest, AcpError> {
    debug!(
        "Creating PR {}/{}: {} -> {}",
        pr.owner, pr.repo, pr.head, pr.base
    );

    let created = octocrab
        .pulls(&pr.owner, &pr.repo)
        .create(&pr.title, &pr.head, &pr.base)
        .body(&pr.body)
        .draft(Some(pr.draft))
        .send()
        .await
        .map_err(|e| map_octocrab_error(e, pr))?;

    let url = created
        .html_url
        .map(|u| u.to_string())
        .unwrap_or_else(|| {
            format!(
                "https://github.com/{}/{}/pull/{}",
                pr.owner, pr.repo, created.number
            )
        });

    Ok(CreatedPullRequest {
        number: created.number,
        url,
    })
}

fn map_octocrab_error(err: octocrab::Error, pr: &NewPullRequest) -> AcpError {
    let detail = match err {
        octocrab::Error::GitHub { ref source, .. } => {
            let mut detail = source.message.clone();
            if let Some(ref errors) = source.errors {
                for e in errors {
                    if let Some(message) = e.get("message").and_then(|m| m.as_str()) {
                        detail.push_str(&format!(" ({})", message));
                    }
                }
            }
            detail
        }
        ref other => other.to_string(),
    };
    let lowered = detail.to_lowercase();

    let error = AcpError::github(format!("Failed to create pull request: {}", detail));
    if lowered.contains("already exists") {
        error.with_suggestion(format!(
            "A pull request for {} already exists. Update it on GitHub instead.",
            pr.head
        ))
    } else if lowered.contains("not found") {
        error.with_suggestion(format!(
            "Check that {}/{} exists and your token can access it",
            pr.owner, pr.repo
        ))
    } else if lowered.contains("no commits between") {
        error.with_suggestion(format!("Push commits to {} first", pr.head))
    } else {
        error
    }
}

/// Extract owner and repo from a git remote URL.
///
/// Accepts `git@github.com:owner/repo.git`, `ssh://git@github.com/owner/repo`
/// and `https://github.com/owner/repo(.git)`.
pub fn parse_github_remote(url: &str) -> Result<(String, String), AcpError> {
    let url = url.trim();

    if let Some(path) = url.strip_prefix("git@github.com:") {
        return parse_owner_repo_path(path, url);
    }

    if let Some((_, path)) = url.split_once("github.com/") {
        return parse_owner_repo_path(path, url);
    }

    Err(invalid_remote(url))
}

fn parse_owner_repo_path(path: &str, url: &str) -> Result<(String, String), AcpError> {
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut parts = path.split('/').filter(|p| !p.is_empty());

    match (parts.next(), parts.next()) {
        (Some(owner), Some(repo)) => Ok((owner.to_string(), repo.to_string())),
        _ => Err(invalid_remote(url)),
    }
}

fn invalid_remote(url: &str) -> AcpError {
    AcpError::github(format!("Not a GitHub remote: {}", url))
        .with_suggestion("Check your remote with 'git remote -v'.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ssh_url() {
        let (owner, repo) = parse_github_remote("git@github.com:owner/repo.git").unwrap();
        assert_eq!(owner, "owner");
        assert_eq!(repo, "repo");
    }

    #[test]
    fn test_parse_ssh_scheme_url() {
        let (owner, repo) = parse_github_remote("ssh://git@github.com/owner/repo.git").unwrap();
        assert_eq!((owner.as_str(), repo.as_str()), ("owner", "repo"));
    }

    #[test]
    fn test_parse_https_url() {
        let (owner, repo) = parse_github_remote("https://github.com/owner/repo.git").unwrap();
        assert_eq!(owner, "owner");
        assert_eq!(repo, "repo");
    }

    #[test]
    fn test_parse_https_url_no_git_suffix_trailing_slash() {
        let (owner, repo) = parse_github_remote("https://github.com/owner/repo/").unwrap();
        assert_eq!(owner, "owner");
        assert_eq!(repo, "repo");
    }

    #[test]
    fn test_repo_name_ending_in_git_letters() {
        let (_, repo) = parse_github_remote("https://github.com/owner/widget.git").unwrap();
        assert_eq!(repo, "widget");
        let (_, repo) = parse_github_remote("https://github.com/owner/legit").unwrap();
        assert_eq!(repo, "legit");
    }

    #[test]
    fn test_parse_invalid_url() {
        let err = parse_github_remote("https://gitlab.com/owner/repo").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::GitHub);
        assert!(parse_github_remote("https://github.com/owner").is_err());
    }
}
