//! OpenAI-compatible chat client with timeout, cancellation and fallback.
//!
//! Each call spawns one worker task for the HTTP exchange. The caller waits
//! on that task alongside a progress ticker, the deadline and the
//! cancellation token. On timeout or cancel the worker is detached and its
//! result discarded.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::{Host, Url};

use crate::config::{AiConfig, Settings, TIMEOUT_ENV_VAR};
use crate::error::{AcpError, ErrorKind};

use super::progress::ProgressReporter;
use super::think::strip_thinking;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Ollama-specific model options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelOptions {
    pub num_ctx: u32,
}

/// Body of `POST /chat/completions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ModelOptions>,
    pub stream: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Response carrying a single assistant message.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: Some(ResponseMessage {
                    content: Some(content.into()),
                }),
            }],
        }
    }

    /// Content of the first choice, if it is non-blank.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
            .filter(|c| !c.trim().is_empty())
    }
}

/// A validated chat API base URL such as `http://localhost:11434/v1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    pub fn parse(base_url: &str) -> Result<Self, AcpError> {
        let url = Url::parse(base_url.trim()).map_err(|_| invalid_url(base_url))?;

        if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
            return Err(invalid_url(base_url));
        }

        Ok(Self { url })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.as_str())
    }

    /// True for `localhost` and loopback IPs.
    pub fn is_local(&self) -> bool {
        match self.url.host() {
            Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
            Some(Host::Ipv4(ip)) => ip.is_loopback(),
            Some(Host::Ipv6(ip)) => ip.is_loopback(),
            None => false,
        }
    }
}

fn invalid_url(base_url: &str) -> AcpError {
    AcpError::config("Invalid Ollama server URL.")
        .with_suggestion(format!(
            "Check GIT_ACP_BASE_URL in ~/.config/git-acp/.env (got '{}')",
            base_url
        ))
}

/// Failure of a single HTTP exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Other(String),
}

/// Sends one chat request to one endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(
        &self,
        endpoint: &Endpoint,
        request: &ChatRequest,
    ) -> Result<ChatResponse, TransportError>;
}

/// reqwest-backed transport with bearer authentication.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_key: String,
}

impl HttpTransport {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, AcpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AcpError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn complete(
        &self,
        endpoint: &Endpoint,
        request: &ChatRequest,
    ) -> Result<ChatResponse, TransportError> {
        let response = self
            .client
            .post(endpoint.completions_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    TransportError::Connect(e.to_string())
                } else if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Other(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

/// Model and endpoint settings for one client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub api_key: String,
    pub base_url: String,
    pub fallback_base_url: String,
    pub num_ctx: Option<u32>,
}

impl ClientConfig {
    /// Commit-message client: the CLI model override wins over settings.
    pub fn for_commits(settings: &Settings, ai: &AiConfig) -> Self {
        Self {
            model: ai.model.clone().unwrap_or_else(|| settings.model.clone()),
            num_ctx: ai.num_ctx,
            ..Self::from_settings(settings, settings.model.clone())
        }
    }

    /// Pull-request client using the PR model.
    pub fn for_pr(settings: &Settings) -> Self {
        Self::from_settings(settings, settings.pr_model.clone())
    }

    fn from_settings(settings: &Settings, model: String) -> Self {
        Self {
            model,
            temperature: settings.temperature,
            timeout: settings.timeout,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.clone(),
            fallback_base_url: settings.fallback_base_url.clone(),
            num_ctx: None,
        }
    }
}

/// Chat client used for commit messages and PR descriptions.
pub struct AiClient {
    config: ClientConfig,
    transport: Arc<dyn ChatTransport>,
    cancel: CancellationToken,
}

impl AiClient {
    /// Client over HTTP.
    pub fn new(config: ClientConfig, cancel: CancellationToken) -> Result<Self, AcpError> {
        let transport = HttpTransport::new(config.api_key.clone(), config.timeout)?;
        Self::with_transport(config, Arc::new(transport), cancel)
    }

    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn ChatTransport>,
        cancel: CancellationToken,
    ) -> Result<Self, AcpError> {
        if config.timeout.is_zero() {
            return Err(AcpError::config("AI timeout must be greater than zero.")
                .with_suggestion(format!("Set {} to a positive number of seconds", TIMEOUT_ENV_VAR)));
        }
        Endpoint::parse(&config.base_url)?;

        Ok(Self {
            config,
            transport,
            cancel,
        })
    }

    /// Send `messages` and return the cleaned assistant reply.
    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        progress: &dyn ProgressReporter,
    ) -> Result<String, AcpError> {
        if self.cancel.is_cancelled() {
            return Err(AcpError::cancelled());
        }

        let primary = Endpoint::parse(&self.config.base_url)?;
        debug!(
            "Requesting completion from {} with model {}",
            primary.as_str(),
            self.config.model
        );

        let mut worker = tokio::spawn(send_with_fallback(
            Arc::clone(&self.transport),
            self.config.clone(),
            primary,
            messages,
        ));

        let timeout = self.config.timeout;
        let started = Instant::now();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let result = loop {
            tokio::select! {
                biased;

                joined = &mut worker => {
                    break joined.unwrap_or_else(|e| {
                        Err(AcpError::new(ErrorKind::Request, format!("AI request task failed: {}", e)))
                    });
                }
                _ = self.cancel.cancelled() => {
                    debug!("AI request cancelled");
                    break Err(AcpError::cancelled());
                }
                _ = &mut deadline => {
                    warn!("AI request timed out after {:?}", timeout);
                    break Err(timeout_error(timeout));
                }
                _ = ticker.tick() => {
                    let elapsed = started.elapsed();
                    progress.update(elapsed.as_secs_f64() / timeout.as_secs_f64(), elapsed);
                }
            }
        };
        progress.finish();

        let raw = result?;
        let cleaned = strip_thinking(&raw);
        if cleaned.is_empty() {
            return Err(empty_response());
        }
        Ok(cleaned)
    }
}

async fn send_with_fallback(
    transport: Arc<dyn ChatTransport>,
    config: ClientConfig,
    primary: Endpoint,
    messages: Vec<ChatMessage>,
) -> Result<String, AcpError> {
    let request = build_request(&config, &primary, &messages);

    let response = match transport.complete(&primary, &request).await {
        Ok(response) => response,
        Err(TransportError::Connect(reason)) => {
            let Some(fallback) = fallback_endpoint(&config, &primary)? else {
                return Err(map_transport_error(TransportError::Connect(reason), &config));
            };
            warn!(
                "Could not connect to {} ({}), trying {}",
                primary.as_str(),
                reason,
                fallback.as_str()
            );
            let request = build_request(&config, &fallback, &messages);
            transport
                .complete(&fallback, &request)
                .await
                .map_err(|e| map_transport_error(e, &config))?
        }
        Err(e) => return Err(map_transport_error(e, &config)),
    };

    response
        .first_content()
        .map(str::to_string)
        .ok_or_else(empty_response)
}

fn fallback_endpoint(config: &ClientConfig, primary: &Endpoint) -> Result<Option<Endpoint>, AcpError> {
    if config.fallback_base_url.trim().is_empty() {
        return Ok(None);
    }
    let fallback = Endpoint::parse(&config.fallback_base_url)?;
    Ok((fallback != *primary).then_some(fallback))
}

fn build_request(config: &ClientConfig, endpoint: &Endpoint, messages: &[ChatMessage]) -> ChatRequest {
    // Remote OpenAI-compatible servers reject unknown options
    let options = config
        .num_ctx
        .filter(|_| endpoint.is_local())
        .map(|num_ctx| ModelOptions { num_ctx });

    ChatRequest {
        model: config.model.clone(),
        messages: messages.to_vec(),
        temperature: config.temperature,
        options,
        stream: false,
    }
}

fn map_transport_error(err: TransportError, config: &ClientConfig) -> AcpError {
    match err {
        TransportError::Connect(reason) => {
            debug!("Connection error: {}", reason);
            AcpError::new(ErrorKind::Connectivity, "Could not connect to Ollama server.").with_suggestion(
                "Ensure Ollama is running (run 'ollama serve')\n\
                 Check if server is responsive (curl http://localhost:11434/api/tags)\n\
                 Verify your network connection",
            )
        }
        TransportError::Timeout => timeout_error(config.timeout),
        TransportError::Status { status, ref body } if is_model_missing(status, body) => {
            AcpError::new(
                ErrorKind::ModelNotFound,
                format!("Model '{}' not found.", config.model),
            )
            .with_suggestion(format!("Run 'ollama pull {}'", config.model))
        }
        TransportError::Status { status, body } => AcpError::new(
            ErrorKind::Request,
            format!("AI request failed with HTTP {}: {}", status, body.trim()),
        ),
        TransportError::InvalidResponse(reason) => AcpError::new(
            ErrorKind::Request,
            format!("Invalid response from AI server: {}", reason),
        ),
        TransportError::Other(reason) => {
            AcpError::new(ErrorKind::Request, format!("AI request failed: {}", reason))
        }
    }
}

fn is_model_missing(status: u16, body: &str) -> bool {
    let body = body.to_lowercase();
    status == 404 || (body.contains("model") && body.contains("not found"))
}

fn timeout_error(timeout: Duration) -> AcpError {
    AcpError::new(
        ErrorKind::Timeout,
        format!("AI request timed out after {}s.", timeout.as_secs()),
    )
    .with_suggestion(format!(
        "Increase {} or check the load on your Ollama server",
        TIMEOUT_ENV_VAR
    ))
}

fn empty_response() -> AcpError {
    AcpError::new(ErrorKind::EmptyResponse, "AI returned an empty response.")
        .with_suggestion("Try again or use a different model")
}
