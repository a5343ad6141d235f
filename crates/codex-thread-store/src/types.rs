//! Thread mapping record types.

/// Provider identifier used when none is supplied.
pub const DEFAULT_PROVIDER: &str = "openai-codex-cli";

/// Whether a thread mapping is tracked per user or per conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// One thread handle for all of a user's conversations with a provider.
    User,
    /// One thread handle per distinct conversation id.
    Conversation,
}

impl Scope {
    /// The stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::Conversation => "conversation",
        }
    }

    /// Parse a stored scope string. Unknown values normalize to
    /// `Conversation`, the wider scope.
    pub fn parse(value: &str) -> Scope {
        if value == "user" {
            Scope::User
        } else {
            Scope::Conversation
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored thread mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRecord {
    pub user_id: String,
    pub provider: String,
    pub scope: Scope,
    pub conversation_id: String,
    pub thread_id: String,
    /// Last write time, Unix milliseconds.
    pub updated_at_ms: i64,
}

/// Input for an upsert; the store assigns `updated_at` itself.
#[derive(Debug, Clone)]
pub struct ThreadUpsert {
    pub user_id: String,
    pub provider: String,
    pub scope: Scope,
    pub conversation_id: String,
    pub thread_id: String,
}

/// Lower-case the provider, falling back to the default when blank.
pub(crate) fn normalize_provider(provider: &str) -> String {
    let trimmed = provider.trim();
    if trimmed.is_empty() {
        DEFAULT_PROVIDER.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/// User-scoped mappings never carry a conversation segment.
pub(crate) fn normalize_conversation_id(scope: Scope, conversation_id: &str) -> String {
    match scope {
        Scope::User => String::new(),
        Scope::Conversation => conversation_id.to_string(),
    }
}
