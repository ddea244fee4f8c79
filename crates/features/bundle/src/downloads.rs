//! Deferred download registry.
//!
//! A handle maps an opaque token to a scratch file and an expiry. Handles are single-use:
//! [`DownloadStore::take`] is the only way to claim one, so of two concurrent claims for the
//! same token exactly one wins.

use chrono::{DateTime, TimeDelta, Utc};
use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::fmt::Debug;
use std::path::PathBuf;

/// Registered archive awaiting download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadHandle {
    /// Path of the archive relative to the scratch root.
    pub file: PathBuf,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl DownloadHandle {
    /// A handle created now that expires after `ttl_seconds`.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, ttl_seconds: u64) -> Self {
        let created_at = Utc::now();
        let ttl = i64::try_from(ttl_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        let expires_at = created_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self { file: file.into(), created_at, expires_at }
    }

    /// A handle is dead from its expiry instant onwards.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Storage for download handles, injected into the bundle slice.
pub trait DownloadStore: Send + Sync + Debug {
    /// Registers `handle` under `token`. Returns `false` (and changes nothing) if the token
    /// is already taken.
    fn put(&self, token: &str, handle: DownloadHandle) -> bool;

    /// Looks a handle up without claiming it.
    fn get(&self, token: &str) -> Option<DownloadHandle>;

    /// Atomically removes and returns the handle.
    fn take(&self, token: &str) -> Option<DownloadHandle>;

    /// Removes and returns every handle expired at `now`.
    fn drain_expired(&self, now: DateTime<Utc>) -> Vec<DownloadHandle>;

    /// Number of registered handles, expired ones included.
    fn len(&self) -> usize;
}

/// In-process [`DownloadStore`].
#[derive(Debug, Default)]
pub struct MemoryDownloadStore {
    handles: Mutex<FxHashMap<String, DownloadHandle>>,
}

impl MemoryDownloadStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DownloadStore for MemoryDownloadStore {
    fn put(&self, token: &str, handle: DownloadHandle) -> bool {
        match self.handles.lock().entry(token.to_owned()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(handle);
                true
            },
        }
    }

    fn get(&self, token: &str) -> Option<DownloadHandle> {
        self.handles.lock().get(token).cloned()
    }

    fn take(&self, token: &str) -> Option<DownloadHandle> {
        self.handles.lock().remove(token)
    }

    fn drain_expired(&self, now: DateTime<Utc>) -> Vec<DownloadHandle> {
        self.handles
            .lock()
            .extract_if(|_, handle| handle.is_expired_at(now))
            .map(|(_, handle)| handle)
            .collect()
    }

    fn len(&self) -> usize {
        self.handles.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn put_refuses_occupied_tokens() {
        let store = MemoryDownloadStore::new();
        assert!(store.put("t", DownloadHandle::new("a.zip", 300)));
        assert!(!store.put("t", DownloadHandle::new("b.zip", 300)));
        assert_eq!(store.get("t").unwrap().file, PathBuf::from("a.zip"));
    }

    #[test]
    fn take_is_single_use() {
        let store = MemoryDownloadStore::new();
        store.put("t", DownloadHandle::new("a.zip", 300));
        assert!(store.take("t").is_some());
        assert!(store.take("t").is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn expiry_is_inclusive() {
        let handle = DownloadHandle::new("a.zip", 300);
        assert_eq!(handle.expires_at - handle.created_at, TimeDelta::seconds(300));
        assert!(!handle.is_expired_at(handle.created_at));
        assert!(handle.is_expired_at(handle.expires_at));

        let immediate = DownloadHandle::new("b.zip", 0);
        assert!(immediate.is_expired_at(immediate.created_at));
    }

    #[test]
    fn drain_expired_keeps_live_handles() {
        let store = MemoryDownloadStore::new();
        store.put("old", DownloadHandle::new("old.zip", 0));
        store.put("live", DownloadHandle::new("live.zip", 300));

        let drained = store.drain_expired(Utc::now());
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].file, PathBuf::from("old.zip"));
        assert!(store.get("live").is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn huge_ttl_saturates() {
        let handle = DownloadHandle::new("a.zip", u64::MAX);
        assert!(!handle.is_expired_at(Utc::now()));
    }

    #[test]
    fn concurrent_takes_have_one_winner() {
        let store = Arc::new(MemoryDownloadStore::new());
        store.put("t", DownloadHandle::new("a.zip", 300));

        let winners: usize = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || usize::from(store.take("t").is_some()))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .sum();

        assert_eq!(winners, 1);
    }
}
