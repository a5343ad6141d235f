//! Transcript rendering for codex prompts.
//!
//! The CLI takes a single prompt string, so conversation history is
//! flattened with role labels. Once a thread exists on the CLI side, the
//! resumed thread already carries earlier turns; re-sending the full
//! history would duplicate context, so only a trailing window goes out.

use crate::types::ChatMessage;

/// Prompt used when the caller supplies no usable messages.
const EMPTY_PROMPT: &str = "You are Codex. Respond helpfully and concisely.";

/// Fixed preamble for fresh (non-resumed) threads.
const PREAMBLE: [&str; 2] = [
    "You are Codex running via the Codex CLI.",
    "Follow system instructions carefully. Use repository context when relevant.",
];

fn role_blocks(messages: &[ChatMessage]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|message| {
            let content = message.content.flatten();
            if content.is_empty() {
                return None;
            }
            Some(format!("{}:\n{}\n", message.role.to_uppercase(), content))
        })
        .collect()
}

/// Render the full history under the fixed system preamble.
pub(crate) fn render_transcript(messages: &[ChatMessage]) -> String {
    let blocks = role_blocks(messages);
    if blocks.is_empty() {
        return EMPTY_PROMPT.to_string();
    }

    let mut lines: Vec<String> = PREAMBLE.iter().map(|s| s.to_string()).collect();
    lines.push(String::new());
    lines.push("Conversation:".to_string());
    lines.push(String::new());
    lines.extend(blocks);
    lines.join("\n").trim().to_string()
}

/// Render only the trailing `window` messages for a resumed thread.
///
/// The window size is a tunable heuristic, not a contract; it only needs
/// to bound the re-sent history once a thread exists.
pub(crate) fn render_resume(messages: &[ChatMessage], window: usize) -> String {
    let start = messages.len().saturating_sub(window);
    let blocks = role_blocks(&messages[start..]);
    if blocks.is_empty() {
        return render_transcript(messages);
    }
    blocks.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_uses_fallback_prompt() {
        assert_eq!(render_transcript(&[]), EMPTY_PROMPT);
        assert_eq!(render_resume(&[], 6), EMPTY_PROMPT);
    }

    #[test]
    fn transcript_labels_roles_and_keeps_order() {
        let messages = vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("question"),
            ChatMessage::assistant("answer"),
        ];
        let prompt = render_transcript(&messages);

        assert!(prompt.starts_with("You are Codex running via the Codex CLI."));
        assert!(prompt.contains("Conversation:"));
        let system = prompt.find("SYSTEM:\nbe brief").unwrap();
        let user = prompt.find("USER:\nquestion").unwrap();
        let assistant = prompt.find("ASSISTANT:\nanswer").unwrap();
        assert!(system < user && user < assistant);
    }

    #[test]
    fn transcript_skips_empty_messages() {
        let messages = vec![ChatMessage::user(""), ChatMessage::user("real")];
        let prompt = render_transcript(&messages);
        assert!(prompt.contains("USER:\nreal"));
        assert_eq!(prompt.matches("USER:").count(), 1);
    }

    #[test]
    fn resume_keeps_only_trailing_window() {
        let messages: Vec<ChatMessage> = (1..=10)
            .map(|i| ChatMessage::user(format!("msg-{i}")))
            .collect();
        let prompt = render_resume(&messages, 3);

        assert!(!prompt.contains("msg-7"));
        assert!(prompt.contains("msg-8"));
        assert!(prompt.contains("msg-10"));
        assert!(!prompt.contains("Conversation:"), "resume omits the preamble");
    }

    #[test]
    fn resume_window_larger_than_history_sends_everything() {
        let messages = vec![ChatMessage::user("only")];
        let prompt = render_resume(&messages, 6);
        assert!(prompt.contains("USER:\nonly"));
    }
}
