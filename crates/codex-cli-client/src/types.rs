//! Chat-completion request and response shapes.
//!
//! These deliberately mimic the widely used chat-completion client shape
//! (`choices[0].message.content`, streaming `choices[0].delta.content`) so
//! callers need no codex-specific handling.

use serde::{Deserialize, Serialize};

use codex_process_runner::TokenUsage;

/// One conversation turn supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Message content: a plain string or a list of typed parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One element of multi-part content; only text parts carry signal here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentPart {
    Text(String),
    Typed {
        #[serde(default)]
        text: Option<String>,
    },
}

impl MessageContent {
    /// Flatten to plain text; non-text parts contribute nothing.
    pub fn flatten(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text(text) => {
                        (!text.is_empty()).then(|| text.clone())
                    }
                    ContentPart::Typed { text } => {
                        text.as_ref().filter(|t| !t.is_empty()).cloned()
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A create-style completion request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
}

/// A full, non-streaming completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl Completion {
    /// Build the single-choice assistant completion the bridge returns.
    pub(crate) fn assistant(model: String, content: String, usage: Option<TokenUsage>) -> Self {
        Self {
            id: format!("codex-cli-{}", uuid::Uuid::new_v4()),
            object: "chat.completion".to_string(),
            created: chrono::Utc::now().timestamp(),
            model,
            choices: vec![Choice {
                index: 0,
                message: AssistantMessage {
                    role: "assistant".to_string(),
                    content,
                },
                finish_reason: "stop".to_string(),
            }],
            usage,
        }
    }

    /// Content of the first (only) choice.
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: AssistantMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub role: String,
    pub content: String,
}

/// One streamed chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionChunk {
    pub choices: Vec<ChunkChoice>,
}

impl CompletionChunk {
    pub(crate) fn content(content: String) -> Self {
        Self {
            choices: vec![ChunkChoice {
                delta: ChunkDelta { content },
            }],
        }
    }

    /// Delta content of the first (only) choice.
    pub fn delta(&self) -> &str {
        self.choices
            .first()
            .map(|choice| choice.delta.content.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub delta: ChunkDelta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkDelta {
    pub content: String,
}

/// What a create-style call returns, depending on the `stream` flag.
#[derive(Debug)]
pub enum CompletionResponse {
    Full(Box<Completion>),
    Stream(crate::stream::CompletionStream),
}

impl CompletionResponse {
    /// Unwrap the non-streaming completion.
    ///
    /// # Panics
    ///
    /// Panics when the response is a stream; intended for callers (and
    /// tests) that did not set `stream`.
    pub fn into_completion(self) -> Completion {
        match self {
            CompletionResponse::Full(completion) => *completion,
            CompletionResponse::Stream(_) => panic!("completion response is a stream"),
        }
    }

    /// Unwrap the chunk stream.
    ///
    /// # Panics
    ///
    /// Panics when the response is a full completion.
    pub fn into_stream(self) -> crate::stream::CompletionStream {
        match self {
            CompletionResponse::Full(_) => panic!("completion response is not a stream"),
            CompletionResponse::Stream(stream) => stream,
        }
    }
}
