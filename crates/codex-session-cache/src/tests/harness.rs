//! In-memory `ThreadStore` fake with call counting and failure injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use codex_thread_store::{Scope, StoreError, StoreResult, ThreadRecord, ThreadStore, ThreadUpsert};

type Identity = (String, String, String, String);

/// Records every call and lets tests inject failures.
#[derive(Default)]
pub struct RecordingStore {
    records: Mutex<HashMap<Identity, String>>,
    list_calls: AtomicUsize,
    find_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
    /// When set, every operation fails with `Unavailable`.
    fail_all: AtomicBool,
    /// Remaining `list_all` calls that report a missing table.
    missing_table_lists: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_all.store(true, Ordering::SeqCst);
        store
    }

    pub fn with_missing_table_lists(count: usize) -> Self {
        let store = Self::default();
        store.missing_table_lists.store(count, Ordering::SeqCst);
        store
    }

    pub fn seed(&self, user_id: &str, provider: &str, scope: Scope, conversation_id: &str, thread_id: &str) {
        self.records.lock().unwrap().insert(
            identity(user_id, provider, scope, conversation_id),
            thread_id.to_string(),
        );
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn stored_thread(&self, user_id: &str, provider: &str, scope: Scope, conversation_id: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .get(&identity(user_id, provider, scope, conversation_id))
            .cloned()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

fn identity(user_id: &str, provider: &str, scope: Scope, conversation_id: &str) -> Identity {
    (
        user_id.to_string(),
        provider.to_string(),
        scope.as_str().to_string(),
        conversation_id.to_string(),
    )
}

impl ThreadStore for RecordingStore {
    fn upsert(&self, record: &ThreadUpsert) -> StoreResult<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.records.lock().unwrap().insert(
            identity(
                &record.user_id,
                &record.provider,
                record.scope,
                &record.conversation_id,
            ),
            record.thread_id.clone(),
        );
        Ok(())
    }

    fn find_thread_id(
        &self,
        user_id: &str,
        provider: &str,
        scope: Scope,
        conversation_id: &str,
    ) -> StoreResult<Option<String>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&identity(user_id, provider, scope, conversation_id))
            .cloned())
    }

    fn list_all(&self) -> StoreResult<Vec<ThreadRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .missing_table_lists
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::MissingTable);
        }
        self.check_available()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|((user_id, provider, scope, conversation_id), thread_id)| ThreadRecord {
                user_id: user_id.clone(),
                provider: provider.clone(),
                scope: Scope::parse(scope),
                conversation_id: conversation_id.clone(),
                thread_id: thread_id.clone(),
                updated_at_ms: 0,
            })
            .collect())
    }
}
