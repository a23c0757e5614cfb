//! Chat client against a mocked OpenAI-compatible server.

use std::time::Duration;

use git_acp::ai::{AiClient, ChatMessage, ClientConfig, NoProgress};
use git_acp::error::ErrorKind;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Nothing listens on port 1, so connecting fails immediately.
const UNREACHABLE: &str = "http://127.0.0.1:1/v1";

fn config(base_url: &str, fallback_base_url: &str) -> ClientConfig {
    ClientConfig {
        model: "test-model".to_string(),
        temperature: 0.7,
        timeout: Duration::from_secs(10),
        api_key: "ollama".to_string(),
        base_url: base_url.to_string(),
        fallback_base_url: fallback_base_url.to_string(),
        num_ctx: None,
    }
}

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

fn messages() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You write commit messages."),
        ChatMessage::user("diff --git a/a.py b/a.py"),
    ]
}

async fn ask(config: ClientConfig) -> Result<String, git_acp::AcpError> {
    let client = AiClient::new(config, CancellationToken::new())?;
    client.chat_completion(messages(), &NoProgress).await
}

#[tokio::test]
async fn test_completion_is_returned_without_thinking() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer ollama"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "stream": false,
            "messages": [
                { "role": "system", "content": "You write commit messages." },
                { "role": "user", "content": "diff --git a/a.py b/a.py" }
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("<think>looks like setup</think>\nAdd project skeleton")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let base = format!("{}/v1", server.uri());
    let reply = ask(config(&base, "")).await.unwrap();

    assert_eq!(reply, "Add project skeleton");
}

#[tokio::test]
async fn test_num_ctx_sent_to_local_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "options": { "num_ctx": 8192 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let base = format!("{}/v1", server.uri());
    let mut cfg = config(&base, "");
    cfg.num_ctx = Some(8192);

    assert_eq!(ask(cfg).await.unwrap(), "ok");
}

#[tokio::test]
async fn test_unreachable_primary_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("From fallback")))
        .expect(1)
        .mount(&server)
        .await;

    let fallback = format!("{}/v1", server.uri());
    let reply = ask(config(UNREACHABLE, &fallback)).await.unwrap();

    assert_eq!(reply, "From fallback");
}

#[tokio::test]
async fn test_unreachable_without_fallback_is_connectivity_error() {
    let err = ask(config(UNREACHABLE, "")).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Connectivity);
    assert!(err.suggestion_line().contains("ollama serve"));
}

#[tokio::test]
async fn test_http_error_does_not_fall_back() {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("unused")))
        .expect(0)
        .mount(&fallback)
        .await;

    let err = ask(config(
        &format!("{}/v1", primary.uri()),
        &format!("{}/v1", fallback.uri()),
    ))
    .await
    .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Request);
    assert!(err.message.contains("500"));
}

#[tokio::test]
async fn test_missing_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({ "error": { "message": "model \"test-model\" not found" } })),
        )
        .mount(&server)
        .await;

    let err = ask(config(&format!("{}/v1", server.uri()), "")).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::ModelNotFound);
    assert_eq!(err.suggestion.as_deref(), Some("Run 'ollama pull test-model'"));
}

#[tokio::test]
async fn test_blank_or_thinking_only_reply_is_empty_response() {
    for content in ["   ", "<think>nothing useful</think>"] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(content)))
            .mount(&server)
            .await;

        let err = ask(config(&format!("{}/v1", server.uri()), "")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::EmptyResponse, "content {:?}", content);
    }
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("too late"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut cfg = config(&format!("{}/v1", server.uri()), "");
    cfg.timeout = Duration::from_secs(1);

    let err = ask(cfg).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Timeout);
    assert!(err.suggestion_line().contains("GIT_ACP_AI_TIMEOUT"));
}

#[tokio::test]
async fn test_invalid_base_url_is_config_error() {
    let err = ask(config("localhost:11434", "")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Config);
}
