//! Canonical session key encoding.
//!
//! Wire format:
//! - `<provider>::user::<userId>` for user scope
//! - `<provider>::user::<userId>::conversation::<conversationId>` for
//!   conversation scope
//!
//! The builder and parser must stay in lockstep: persistence lookups depend
//! on parsing a key back into its components.

use codex_thread_store::{Scope, DEFAULT_PROVIDER};

/// User id used when none is supplied.
pub const DEFAULT_USER_ID: &str = "anonymous-user";

/// Conversation id used when conversation scope is requested without one.
pub const DEFAULT_CONVERSATION_ID: &str = "default-conversation";

const USER_MARKER: &str = "::user::";
const CONVERSATION_MARKER: &str = "::conversation::";
const SEPARATOR: &str = "::";

/// Collapse the key separator out of a raw segment so the encoded form
/// always parses back to the same components.
fn sanitize_segment(raw: &str) -> String {
    let mut segment = raw.to_string();
    while segment.contains(SEPARATOR) {
        segment = segment.replace(SEPARATOR, ":");
    }
    segment
}

/// The components of a canonical session key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    pub provider: String,
    pub user_id: String,
    pub scope: Scope,
    pub conversation_id: String,
}

impl SessionKey {
    /// Build a normalized key: provider lower-cased (defaulted when blank),
    /// user defaulted when blank, and the conversation segment forced empty
    /// for user scope or to the fixed placeholder for conversation scope.
    /// The `::` separator is collapsed out of every segment, so the
    /// canonical form of any constructed key parses back to the same
    /// components.
    pub fn new(provider: &str, user_id: &str, scope: Scope, conversation_id: &str) -> Self {
        let provider = if provider.trim().is_empty() {
            DEFAULT_PROVIDER.to_string()
        } else {
            sanitize_segment(&provider.trim().to_lowercase())
        };
        let user_id = if user_id.is_empty() {
            DEFAULT_USER_ID.to_string()
        } else {
            sanitize_segment(user_id)
        };
        let conversation_id = match scope {
            Scope::User => String::new(),
            Scope::Conversation => {
                if conversation_id.is_empty() {
                    DEFAULT_CONVERSATION_ID.to_string()
                } else {
                    sanitize_segment(conversation_id)
                }
            }
        };

        Self {
            provider,
            user_id,
            scope,
            conversation_id,
        }
    }

    /// Encode into the canonical string form.
    pub fn canonical(&self) -> String {
        match self.scope {
            Scope::User => format!("{}{}{}", self.provider, USER_MARKER, self.user_id),
            Scope::Conversation => format!(
                "{}{}{}{}{}",
                self.provider, USER_MARKER, self.user_id, CONVERSATION_MARKER, self.conversation_id
            ),
        }
    }

    /// Decode a canonical key back into its components.
    ///
    /// Returns `None` for strings this module did not produce. Segments
    /// containing the `::` separator are rejected rather than misparsed.
    pub fn parse(key: &str) -> Option<Self> {
        let (provider, rest) = key.split_once(USER_MARKER)?;
        if provider.is_empty() || provider.contains(SEPARATOR) {
            return None;
        }

        let (user_id, scope, conversation_id) = match rest.split_once(CONVERSATION_MARKER) {
            Some((user_id, conversation_id)) => (user_id, Scope::Conversation, conversation_id),
            None => (rest, Scope::User, ""),
        };

        if user_id.is_empty() || user_id.contains(SEPARATOR) {
            return None;
        }
        if scope == Scope::Conversation
            && (conversation_id.is_empty() || conversation_id.contains(SEPARATOR))
        {
            return None;
        }

        Some(Self {
            provider: provider.to_string(),
            user_id: user_id.to_string(),
            scope,
            conversation_id: conversation_id.to_string(),
        })
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}
