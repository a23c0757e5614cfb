//! Chat-completion access for commit messages and PR descriptions.

pub mod client;
pub mod progress;
pub mod think;

pub use client::{
    AiClient, ChatMessage, ChatRequest, ChatResponse, ChatTransport, ClientConfig, Endpoint,
    HttpTransport, Role, TransportError,
};
pub use progress::{NoProgress, ProgressReporter, TerminalProgress};
pub use think::strip_thinking;
