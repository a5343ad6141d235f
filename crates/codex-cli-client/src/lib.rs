//! Chat-completion-shaped client backed by the codex CLI.
//!
//! Callers hand over `{model, messages, stream}` and get back either a full
//! completion object or a finite sequence of delta chunks, exactly like a
//! remote chat-completion API. Underneath, each request spawns one
//! `codex exec` invocation; the session continuity cache resumes the same
//! CLI thread across independent requests, so the CLI's native session
//! format never leaks to callers.

mod client;
mod error;
mod prompt;
mod stream;
mod types;

pub use client::{ClientConfig, CodexCliClient};
pub use error::{ClientError, ClientResult};
pub use stream::CompletionStream;
pub use types::{
    AssistantMessage, ChatMessage, Choice, ChunkChoice, ChunkDelta, Completion, CompletionChunk,
    CompletionRequest, CompletionResponse, ContentPart, MessageContent,
};
