//! Session continuity for the codex CLI bridge.
//!
//! Maps a canonical (provider, user, scope, conversation) key to the codex
//! CLI's internal thread id so that independent top-level requests resume
//! the same thread. The in-memory map is authoritative within the process;
//! the thread store is a best-effort durability layer hydrated lazily on
//! first use and written back fire-and-forget.

mod cache;
mod key;

#[cfg(test)]
mod tests;

pub use cache::{SessionCacheConfig, SessionContinuityCache};
pub use key::{SessionKey, DEFAULT_CONVERSATION_ID, DEFAULT_USER_ID};
