//! TTL/LRU continuity cache backed by the thread store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use codex_thread_store::{StoreError, ThreadStore, ThreadUpsert};

use crate::key::SessionKey;

/// Tuning knobs for the continuity cache.
///
/// Defaults mirror production behavior: a week of inactivity expires a
/// session, and the map is bounded at 1000 entries with least-recently-used
/// eviction beyond that.
#[derive(Debug, Clone)]
pub struct SessionCacheConfig {
    /// Inactivity window after which an entry expires. An entry exactly at
    /// the boundary counts as expired.
    pub ttl: Duration,
    /// Maximum number of in-memory entries before LRU eviction.
    pub max_entries: usize,
    /// How many times hydration retries when the backing table is missing.
    pub hydrate_attempts: u32,
    /// Fixed delay between hydration attempts.
    pub hydrate_retry_delay: Duration,
}

impl Default for SessionCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(7 * 24 * 60 * 60),
            max_entries: 1000,
            hydrate_attempts: 5,
            hydrate_retry_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    thread_id: String,
    last_used_at: Instant,
    created_at: Instant,
}

/// In-memory session map with lazy persistence hydration and write-through.
///
/// Owned by whatever composition root wires the bridge together; there is
/// no process-wide singleton. All continuity degradation is soft: a failed
/// store never fails a request, it only makes the next request start a
/// fresh thread.
pub struct SessionContinuityCache {
    config: SessionCacheConfig,
    store: Arc<dyn ThreadStore>,
    sessions: Mutex<HashMap<String, SessionEntry>>,
    /// Guards the one-shot hydration pass; the flag records completion so
    /// late callers skip straight through.
    hydration: tokio::sync::Mutex<bool>,
}

impl SessionContinuityCache {
    /// Create a cache with default tuning.
    pub fn new(store: Arc<dyn ThreadStore>) -> Self {
        Self::with_config(store, SessionCacheConfig::default())
    }

    /// Create a cache with explicit tuning.
    pub fn with_config(store: Arc<dyn ThreadStore>, config: SessionCacheConfig) -> Self {
        Self {
            config,
            store,
            sessions: Mutex::new(HashMap::new()),
            hydration: tokio::sync::Mutex::new(false),
        }
    }

    /// Look up the thread id for a canonical session key.
    ///
    /// Refreshes recency on an in-memory hit. On a miss, falls through to
    /// the thread store and backfills the map on a persistence hit. Store
    /// failures are logged and degrade to a miss.
    pub async fn get(&self, session_key: &str) -> Option<String> {
        if session_key.is_empty() {
            return None;
        }

        self.ensure_hydrated().await;
        self.purge();

        {
            let mut sessions = self.sessions.lock().expect("lock poisoned");
            if let Some(entry) = sessions.get_mut(session_key) {
                entry.last_used_at = Instant::now();
                return Some(entry.thread_id.clone());
            }
        }

        let key = SessionKey::parse(session_key)?;
        match self.store.find_thread_id(
            &key.user_id,
            &key.provider,
            key.scope,
            &key.conversation_id,
        ) {
            Ok(Some(thread_id)) => {
                debug!(session_key, "Backfilled session from thread store");
                self.insert_entry(session_key, &thread_id);
                Some(thread_id)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(session_key, error = %err, "Thread store lookup failed; treating as miss");
                None
            }
        }
    }

    /// Record the thread id for a canonical session key.
    ///
    /// The in-memory map is updated immediately, so a `get` within the same
    /// process observes the write without any asynchronous delay. The store
    /// write is fire-and-forget; durability across restarts is an
    /// optimization, not a correctness requirement.
    pub fn set(&self, session_key: &str, thread_id: &str) {
        if session_key.is_empty() || thread_id.is_empty() {
            return;
        }

        self.purge();
        self.insert_entry(session_key, thread_id);

        let Some(key) = SessionKey::parse(session_key) else {
            debug!(session_key, "Session key is not canonical; skipping persistence");
            return;
        };

        let store = self.store.clone();
        let record = ThreadUpsert {
            user_id: key.user_id,
            provider: key.provider,
            scope: key.scope,
            conversation_id: key.conversation_id,
            thread_id: thread_id.to_string(),
        };
        let session_key = session_key.to_string();
        tokio::spawn(async move {
            if let Err(err) = store.upsert(&record) {
                warn!(session_key, error = %err, "Failed to persist session thread");
            }
        });
    }

    /// Refresh recency for a key without looking anything up.
    pub fn touch(&self, session_key: &str) {
        let mut sessions = self.sessions.lock().expect("lock poisoned");
        if let Some(entry) = sessions.get_mut(session_key) {
            entry.last_used_at = Instant::now();
        }
    }

    /// Number of live in-memory entries.
    pub fn len(&self) -> usize {
        self.sessions.lock().expect("lock poisoned").len()
    }

    /// Whether the in-memory map is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_entry(&self, session_key: &str, thread_id: &str) {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().expect("lock poisoned");
        let created_at = sessions
            .get(session_key)
            .map(|entry| entry.created_at)
            .unwrap_or(now);
        sessions.insert(
            session_key.to_string(),
            SessionEntry {
                thread_id: thread_id.to_string(),
                last_used_at: now,
                created_at,
            },
        );
        Self::enforce_limit(&mut sessions, self.config.max_entries);
    }

    /// Lazy eviction, applied on every access path: TTL first, then LRU
    /// overflow. No background timer exists.
    fn purge(&self) {
        let now = Instant::now();
        let ttl = self.config.ttl;
        let mut sessions = self.sessions.lock().expect("lock poisoned");
        sessions.retain(|_, entry| now.duration_since(entry.last_used_at) < ttl);
        Self::enforce_limit(&mut sessions, self.config.max_entries);
    }

    fn enforce_limit(sessions: &mut HashMap<String, SessionEntry>, max_entries: usize) {
        if sessions.len() <= max_entries {
            return;
        }

        let mut by_recency: Vec<(String, Instant)> = sessions
            .iter()
            .map(|(key, entry)| (key.clone(), entry.last_used_at))
            .collect();
        by_recency.sort_by_key(|(_, last_used_at)| *last_used_at);

        let overflow = sessions.len() - max_entries;
        for (key, _) in by_recency.into_iter().take(overflow) {
            sessions.remove(&key);
        }
    }

    /// One-shot hydration from the thread store, shared by all concurrent
    /// first callers. A missing backing table is retried a bounded number
    /// of times; any other failure leaves the cache purely in-memory for
    /// the rest of the process lifetime.
    async fn ensure_hydrated(&self) {
        let mut hydrated = self.hydration.lock().await;
        if *hydrated {
            return;
        }

        let attempts = self.config.hydrate_attempts.max(1);
        for attempt in 1..=attempts {
            match self.store.list_all() {
                Ok(records) => {
                    let now = Instant::now();
                    let mut sessions = self.sessions.lock().expect("lock poisoned");
                    for record in &records {
                        let key = SessionKey::new(
                            &record.provider,
                            &record.user_id,
                            record.scope,
                            &record.conversation_id,
                        )
                        .canonical();
                        // An invocation may already have written a fresher
                        // thread id; the live entry wins.
                        sessions.entry(key).or_insert_with(|| SessionEntry {
                            thread_id: record.thread_id.clone(),
                            last_used_at: now,
                            created_at: now,
                        });
                    }
                    Self::enforce_limit(&mut sessions, self.config.max_entries);
                    debug!(count = records.len(), "Hydrated session cache from thread store");
                    break;
                }
                Err(StoreError::MissingTable) if attempt < attempts => {
                    debug!(attempt, "Thread table missing; retrying hydration");
                    tokio::time::sleep(self.config.hydrate_retry_delay).await;
                }
                Err(err) => {
                    warn!(error = %err, "Session cache hydration failed; continuing in-memory only");
                    break;
                }
            }
        }

        *hydrated = true;
    }
}

impl std::fmt::Debug for SessionContinuityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContinuityCache")
            .field("entries", &self.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
