//! Integration tests for pull request creation with mocked octocrab.

use git_acp::error::ErrorKind;
use git_acp::github::{NewPullRequest, pr::create_pull_request_with_client};
use octocrab::Octocrab;
use serde_json::{Map, Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create an octocrab client pointing to a mock server.
async fn mock_client(server: &MockServer) -> Octocrab {
    Octocrab::builder()
        .base_uri(server.uri())
        .expect("Failed to set base URI")
        .build()
        .expect("Failed to build octocrab")
}

/// A user object with every field octocrab's `Author` requires.
fn mock_user(login: &str, id: u64) -> Value {
    let api = format!("https://api.github.com/users/{}", login);
    let mut user = Map::new();
    user.insert("login".into(), json!(login));
    user.insert("id".into(), json!(id));
    user.insert("node_id".into(), json!(format!("U_{}", id)));
    user.insert("avatar_url".into(), json!(format!("https://avatars.githubusercontent.com/u/{}", id)));
    user.insert("gravatar_id".into(), json!(""));
    user.insert("url".into(), json!(api));
    user.insert("html_url".into(), json!(format!("https://github.com/{}", login)));
    for (key, suffix) in [
        ("followers_url", "/followers"),
        ("following_url", "/following{/other_user}"),
        ("gists_url", "/gists{/gist_id}"),
        ("starred_url", "/starred{/owner}{/repo}"),
        ("subscriptions_url", "/subscriptions"),
        ("organizations_url", "/orgs"),
        ("repos_url", "/repos"),
        ("events_url", "/events{/privacy}"),
        ("received_events_url", "/received_events"),
    ] {
        user.insert(key.into(), json!(format!("{}{}", api, suffix)));
    }
    user.insert("type".into(), json!("User"));
    user.insert("site_admin".into(), json!(false));
    Value::Object(user)
}

fn mock_repo() -> Value {
    json!({
        "id": 1,
        "node_id": "R_1",
        "name": "repo",
        "full_name": "owner/repo",
        "owner": mock_user("owner", 1),
        "private": false,
        "html_url": "https://github.com/owner/repo",
        "url": "https://api.github.com/repos/owner/repo",
        "fork": false
    })
}

/// An open pull request as returned by `POST /repos/{owner}/{repo}/pulls`.
fn created_pr(number: u64, title: &str, draft: bool) -> Value {
    let api = format!("https://api.github.com/repos/owner/repo/pulls/{}", number);
    let html = format!("https://github.com/owner/repo/pull/{}", number);

    let branch = |name: &str, sha: &str| {
        json!({
            "label": format!("owner:{}", name),
            "ref": name,
            "sha": sha,
            "user": mock_user("owner", 1),
            "repo": mock_repo()
        })
    };

    let mut pr = Map::new();
    pr.insert("url".into(), json!(api));
    pr.insert("id".into(), json!(number * 1000));
    pr.insert("node_id".into(), json!(format!("PR_{}", number)));
    pr.insert("html_url".into(), json!(html));
    pr.insert("diff_url".into(), json!(format!("{}.diff", html)));
    pr.insert("patch_url".into(), json!(format!("{}.patch", html)));
    pr.insert("number".into(), json!(number));
    pr.insert("state".into(), json!("open"));
    pr.insert("locked".into(), json!(false));
    pr.insert("title".into(), json!(title));
    pr.insert("body".into(), json!("## Summary"));
    pr.insert("user".into(), mock_user("testuser", 100));
    pr.insert("labels".into(), json!([]));
    pr.insert("assignees".into(), json!([]));
    pr.insert("requested_reviewers".into(), json!([]));
    pr.insert("created_at".into(), json!("2024-01-01T00:00:00Z"));
    pr.insert("updated_at".into(), json!("2024-01-01T00:00:00Z"));
    pr.insert("closed_at".into(), Value::Null);
    pr.insert("merged_at".into(), Value::Null);
    pr.insert("head".into(), branch("feature", "abc123"));
    pr.insert("base".into(), branch("main", "def456"));
    pr.insert("draft".into(), json!(draft));
    pr.insert("merged".into(), json!(false));
    pr.insert("comments".into(), json!(0));
    pr.insert("commits".into(), json!(2));
    pr.insert("additions".into(), json!(10));
    pr.insert("deletions".into(), json!(2));
    pr.insert("changed_files".into(), json!(3));
    Value::Object(pr)
}

fn new_pr(draft: bool) -> NewPullRequest {
    NewPullRequest {
        owner: "owner".to_string(),
        repo: "repo".to_string(),
        title: "Add login flow".to_string(),
        body: "## Summary\n\nAdds login.".to_string(),
        head: "feature".to_string(),
        base: "main".to_string(),
        draft,
    }
}

fn validation_error(message: &str) -> Value {
    json!({
        "message": "Validation Failed",
        "errors": [{ "resource": "PullRequest", "code": "custom", "message": message }],
        "documentation_url": "https://docs.github.com/rest/pulls/pulls#create-a-pull-request"
    })
}

#[tokio::test]
async fn test_create_sends_title_branches_and_draft() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/owner/repo/pulls"))
        .and(body_partial_json(json!({
            "title": "Add login flow",
            "head": "feature",
            "base": "main",
            "body": "## Summary\n\nAdds login.",
            "draft": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(created_pr(7, "Add login flow", true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server).await;
    let created = create_pull_request_with_client(&client, &new_pr(true))
        .await
        .unwrap();

    assert_eq!(created.number, 7);
    assert_eq!(created.url, "https://github.com/owner/repo/pull/7");
}

#[tokio::test]
async fn test_existing_pull_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/owner/repo/pulls"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(validation_error("A pull request already exists for owner:feature.")),
        )
        .mount(&server)
        .await;

    let client = mock_client(&server).await;
    let err = create_pull_request_with_client(&client, &new_pr(false))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::GitHub);
    assert!(err.message.contains("already exists"));
    assert!(err.suggestion_line().contains("feature already exists"));
}

#[tokio::test]
async fn test_no_commits_between_branches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/owner/repo/pulls"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(validation_error("No commits between main and feature")),
        )
        .mount(&server)
        .await;

    let client = mock_client(&server).await;
    let err = create_pull_request_with_client(&client, &new_pr(false))
        .await
        .unwrap_err();

    assert_eq!(err.suggestion.as_deref(), Some("Push commits to feature first"));
}

#[tokio::test]
async fn test_repository_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/owner/repo/pulls"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Not Found",
            "documentation_url": "https://docs.github.com/rest"
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server).await;
    let err = create_pull_request_with_client(&client, &new_pr(false))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::GitHub);
    assert!(err.suggestion_line().contains("owner/repo exists"));
}
