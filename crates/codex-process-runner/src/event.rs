//! Codex CLI event protocol.
//!
//! Each stdout line is a self-describing JSON record. Only the event
//! shapes the bridge consumes are modeled; everything else is protocol
//! noise and is dropped by the parser.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Token usage reported by a completed turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
}

/// An event emitted by a single codex invocation.
///
/// Ordering is significant and preserved exactly as emitted. Events are
/// consumed transiently, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodexEvent {
    /// The CLI started (or resumed) a thread; carries its handle.
    ThreadStarted { thread_id: String },
    /// Assistant output so far. The text is cumulative, not a delta.
    AgentMessage { text: String },
    /// A turn finished; carries usage statistics.
    TurnCompleted { usage: TokenUsage },
    /// The CLI reported a failure. Fatal regardless of exit code.
    Error { message: String },
}

impl CodexEvent {
    /// Interpret a parsed JSON record. Returns `None` for event types the
    /// bridge does not consume.
    pub(crate) fn from_json(value: &serde_json::Value) -> Option<Self> {
        let event_type = value.get("type").and_then(|v| v.as_str())?;

        match event_type {
            "thread.started" => {
                let thread_id = value.get("thread_id").and_then(|v| v.as_str())?;
                Some(Self::ThreadStarted {
                    thread_id: thread_id.to_string(),
                })
            }
            "error" => Some(Self::Error {
                message: error_message(value),
            }),
            "turn.completed" => {
                let usage = value.get("usage")?;
                Some(Self::TurnCompleted {
                    usage: serde_json::from_value(usage.clone()).unwrap_or_default(),
                })
            }
            "item.completed" => {
                let item = value.get("item")?;
                if item.get("type").and_then(|v| v.as_str()) != Some("agent_message") {
                    return None;
                }
                let text = item.get("text").and_then(|v| v.as_str()).unwrap_or("");
                if text.is_empty() {
                    return None;
                }
                Some(Self::AgentMessage {
                    text: text.to_string(),
                })
            }
            _ => None,
        }
    }
}

/// Best-effort extraction of a human-readable error message.
fn error_message(value: &serde_json::Value) -> String {
    if let Some(message) = value.get("message").and_then(|v| v.as_str()) {
        return message.to_string();
    }
    if let Some(message) = value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|v| v.as_str())
    {
        return message.to_string();
    }
    if let Some(message) = value.get("error").and_then(|v| v.as_str()) {
        return message.to_string();
    }
    "Codex CLI reported an error.".to_string()
}

/// Regex matching ANSI escape and OSC sequences.
pub(crate) fn ansi_regex() -> Regex {
    Regex::new(r"\x1B(?:\[[0-9;?]*[A-Za-z~]|\][^\x07]*\x07)").expect("valid ANSI regex")
}

/// Strip terminal noise from a stdout line and attempt to parse it as a
/// codex event.
///
/// Returns `None` for empty lines, non-JSON lines, invalid JSON, and event
/// types the bridge ignores. Dropping these silently is a deliberate
/// tolerance policy: the CLI's output protocol may emit noise or grow new
/// event types.
pub(crate) fn parse_event_line(line: &str, ansi: &Regex) -> Option<CodexEvent> {
    let clean = ansi.replace_all(line, "");
    let clean = clean.trim();

    if clean.is_empty() || !clean.starts_with('{') {
        return None;
    }

    let value: serde_json::Value = serde_json::from_str(clean).ok()?;
    CodexEvent::from_json(&value)
}
