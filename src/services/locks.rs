//! Keyed async mutex
//!
//! Serializes work per string key (e.g. one import at a time per user)
//! while letting different keys run concurrently. Map entries live only
//! as long as someone holds or waits for them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

/// Process-wide locks for import runs, keyed by requesting user
pub static IMPORT_LOCKS: Lazy<KeyedMutex> = Lazy::new(KeyedMutex::default);

#[derive(Clone, Default)]
pub struct KeyedMutex {
    entries: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

/// Claim on one key's entry; removes the entry on drop when unused
struct EntryGuard {
    key: String,
    entry: Arc<AsyncMutex<()>>,
    owner: KeyedMutex,
}

impl Drop for EntryGuard {
    fn drop(&mut self) {
        let mut entries = self.owner.entries.lock();
        // one reference in the map, one here
        let unused = entries
            .get(&self.key)
            .is_some_and(|e| Arc::ptr_eq(e, &self.entry) && Arc::strong_count(e) == 2);
        if unused {
            entries.remove(&self.key);
        }
    }
}

impl KeyedMutex {
    /// Run `fut` while holding the lock for `key`.
    ///
    /// Callers with the same key run one after another in arrival order.
    pub async fn with_lock<F, T>(&self, key: &str, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let slot = self.claim(key);
        let _held = slot.entry.lock().await;
        fut.await
    }

    fn claim(&self, key: &str) -> EntryGuard {
        let entry = self
            .entries
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone();
        EntryGuard {
            key: key.to_string(),
            entry,
            owner: self.clone(),
        }
    }
}

#[cfg(test)]
impl KeyedMutex {
    /// Number of keys currently held or waited on
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lock key for an import run requested by `user_id`
pub fn import_key(user_id: Option<uuid::Uuid>) -> String {
    match user_id {
        Some(id) => format!("import:{id}"),
        None => "import:anonymous".to_string(),
    }
}
