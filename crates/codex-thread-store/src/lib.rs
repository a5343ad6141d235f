//! Durable storage for codex CLI thread mappings.
//!
//! Each record maps a logical conversation owner
//! (user + provider + scope + conversation) to the codex CLI's internal
//! thread id, so a later request can resume the same thread. The store
//! exposes exactly three operations; everything else about continuity
//! (TTL, eviction, key encoding) lives in `codex-session-cache`.

mod error;
mod sqlite;
mod types;

pub use error::{StoreError, StoreResult};
pub use sqlite::SqliteThreadStore;
pub use types::{Scope, ThreadRecord, ThreadUpsert, DEFAULT_PROVIDER};

/// The persistence port consumed by the session continuity cache.
///
/// Implementations must be idempotent on `upsert` for a given
/// (user, provider, scope, conversation) tuple; concurrent writers to the
/// same tuple are resolved last-write-wins.
pub trait ThreadStore: Send + Sync {
    /// Insert or replace the thread mapping for the record's identity tuple.
    ///
    /// A blank user id or thread id is a no-op.
    fn upsert(&self, record: &ThreadUpsert) -> StoreResult<()>;

    /// Look up the thread id for an identity tuple.
    fn find_thread_id(
        &self,
        user_id: &str,
        provider: &str,
        scope: Scope,
        conversation_id: &str,
    ) -> StoreResult<Option<String>>;

    /// List every stored mapping (used for cache hydration at startup).
    fn list_all(&self) -> StoreResult<Vec<ThreadRecord>>;
}
