//! Error type shared by every git-acp module, built on thiserror.

use std::fmt;

use thiserror::Error;

/// Broad class of a failure.
///
/// The workflow branches on the kind, never on the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The user backed out of a prompt or pressed Ctrl-C.
    Cancelled,
    /// There was nothing to do.
    NoOp,
    /// Invalid configuration or CLI input.
    Config,
    /// The chat endpoint could not be reached.
    Connectivity,
    Timeout,
    ModelNotFound,
    EmptyResponse,
    /// Any other failure while talking to the chat endpoint.
    Request,
    Classification,
    /// A git command or repository query failed.
    Git,
    GitHub,
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::NoOp => "no-op",
            ErrorKind::Config => "configuration",
            ErrorKind::Connectivity => "connectivity",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ModelNotFound => "model-not-found",
            ErrorKind::EmptyResponse => "empty-response",
            ErrorKind::Request => "request",
            ErrorKind::Classification => "classification",
            ErrorKind::Git => "git",
            ErrorKind::GitHub => "github",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A git-acp failure: a message plus optional suggestion and context.
///
/// Renders as:
/// ```text
/// <context>:
/// <message>
/// Suggestion: <suggestion lines joined by "; ">
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", self.render())]
pub struct AcpError {
    pub kind: ErrorKind,
    pub message: String,
    pub suggestion: Option<String>,
    pub context: Option<String>,
}

impl AcpError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            suggestion: None,
            context: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "Operation cancelled by user.")
    }

    pub fn git(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Git, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn github(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GitHub, message)
    }

    pub fn no_op(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoOp, message)
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }

    /// The suggestion on one line, or an empty string.
    pub fn suggestion_line(&self) -> String {
        self.suggestion
            .as_deref()
            .map(join_lines)
            .unwrap_or_default()
    }

    fn render(&self) -> String {
        let mut parts = Vec::new();

        if let Some(ref context) = self.context {
            parts.push(format!("{}:", context));
        }

        parts.push(self.message.clone());

        if let Some(ref suggestion) = self.suggestion {
            parts.push(format!("Suggestion: {}", join_lines(suggestion)));
        }

        parts.join("\n")
    }
}

fn join_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<git2::Error> for AcpError {
    fn from(err: git2::Error) -> Self {
        AcpError::git(err.message().to_string())
    }
}
