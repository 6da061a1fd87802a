// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Two-tier key-value adapter: local LRU in front of an optional host store.
//!
//! - Writes always land in the local cache and are mirrored to the external
//!   store when one is attached.
//! - Reads try the local cache first and fall back to the external store.
//! - An external failure is returned to the caller once, and the store is
//!   then detached: the process carries on with the local cache alone.
//! - The local cache only evicts while an external store holds a copy of
//!   every entry.
//! - An empty value reads back as a miss.

use tracing::{debug, error};

use super::local::LocalCache;
use super::session_store::{SessionStore, StoreResult};

pub struct KvStore {
    local: LocalCache,
    external: Option<Box<dyn SessionStore>>,
    batch_depth: usize,
    commit_deferred: bool,
}

impl KvStore {
    pub fn local_only(capacity: usize) -> Self {
        Self {
            local: LocalCache::new(capacity),
            external: None,
            batch_depth: 0,
            commit_deferred: false,
        }
    }

    pub fn with_external(capacity: usize, store: impl SessionStore + 'static) -> Self {
        let mut kv = Self::local_only(capacity);
        kv.external = Some(Box::new(store));
        kv.local.bound();
        kv
    }

    /// Attach (or replace) the external store.
    ///
    /// Entries already cached locally are copied into the store first, so
    /// the local cache can start evicting without losing anything. If the
    /// copy fails the store is not attached.
    pub fn attach(&mut self, store: impl SessionStore + 'static) -> StoreResult<()> {
        let mut store: Box<dyn SessionStore> = Box::new(store);

        let mut mirrored = 0;
        for (key, value) in self.local.iter() {
            if let Err(err) = store.set(key, value) {
                error!(error = %err, "Session store rejected cached entries, not attaching");
                return Err(err);
            }
            mirrored += 1;
        }
        if mirrored > 0 {
            if let Err(err) = store.commit() {
                error!(error = %err, "Session store rejected cached entries, not attaching");
                return Err(err);
            }
            debug!(mirrored, "Copied cached entries into session store");
        }

        self.external = Some(store);
        self.commit_deferred = false;
        self.local.bound();
        Ok(())
    }

    pub fn has_external(&self) -> bool {
        self.external.is_some()
    }

    /// Write `value` under `key`.
    ///
    /// With `persist` set, the external store's durable commit runs now, or
    /// at [`KvStore::commit_batch`] when a batch is open.
    pub fn store(&mut self, key: &str, value: &str, persist: bool) -> StoreResult<()> {
        debug!(key, persist, "Storing cache entry");
        self.local.put(key, value);

        let Some(external) = self.external.as_mut() else {
            return Ok(());
        };
        let result = external.set(key, value);
        self.guard(result)?;

        if persist {
            if self.batch_depth > 0 {
                self.commit_deferred = true;
            } else {
                self.commit_external()?;
            }
        }
        Ok(())
    }

    /// Look up `key`. Absence (or an empty value) is `Ok(None)`.
    pub fn retrieve(&mut self, key: &str) -> StoreResult<Option<String>> {
        let mut value = self.local.get(key).filter(|v| !v.is_empty());

        if value.is_none() {
            if let Some(external) = self.external.as_ref() {
                let result = external.get(key);
                value = self.guard(result)?.filter(|v| !v.is_empty());
            }
        }

        debug!(key, hit = value.is_some(), "Retrieved cache entry");
        Ok(value)
    }

    /// Remove every entry whose key starts with `prefix`, locally and
    /// externally. Returns the number of external entries removed.
    pub fn invalidate_prefix(&mut self, prefix: &str) -> StoreResult<usize> {
        let local_removed = self.local.remove_prefix(prefix);

        let Some(external) = self.external.as_mut() else {
            debug!(prefix, local_removed, "Invalidated local cache entries");
            return Ok(0);
        };

        let result = match external.bulk_clear() {
            Some(bulk) => bulk.clear_prefix(prefix),
            None => clear_by_enumeration(&mut **external, prefix),
        };
        let external_removed = self.guard(result)?;

        if self.batch_depth > 0 {
            self.commit_deferred = true;
        } else {
            self.commit_external()?;
        }

        debug!(prefix, local_removed, external_removed, "Invalidated cache entries");
        Ok(external_removed)
    }

    /// Open a batch: durable commits requested inside it are deferred.
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Close a batch. The outermost close performs at most one durable
    /// commit covering every deferred write.
    pub fn commit_batch(&mut self) -> StoreResult<()> {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth == 0 && self.commit_deferred {
            self.commit_deferred = false;
            self.commit_external()?;
        }
        Ok(())
    }

    fn commit_external(&mut self) -> StoreResult<()> {
        let Some(external) = self.external.as_mut() else {
            return Ok(());
        };
        let result = external.commit();
        self.guard(result)
    }

    /// Detach the external store on failure and hand the error back.
    fn guard<T>(&mut self, result: StoreResult<T>) -> StoreResult<T> {
        if let Err(err) = &result {
            error!(
                error = %err,
                "Session store failed, continuing with local cache only"
            );
            self.external = None;
            self.commit_deferred = false;
            self.local.unbound();
        }
        result
    }
}

fn clear_by_enumeration(store: &mut dyn SessionStore, prefix: &str) -> StoreResult<usize> {
    let doomed: Vec<String> = store
        .keys()?
        .into_iter()
        .filter(|k| k.starts_with(prefix))
        .collect();
    for key in &doomed {
        store.remove(key)?;
    }
    Ok(doomed.len())
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingStore;
    use super::*;
    use crate::storage::{MemorySessionStore, RedbSessionStore};

    #[test]
    fn local_only_round_trip() {
        let mut kv = KvStore::local_only(16);
        kv.store("k", "v", true).unwrap();
        assert_eq!(kv.retrieve("k").unwrap().as_deref(), Some("v"));
        assert!(kv.retrieve("missing").unwrap().is_none());
    }

    #[test]
    fn reads_fall_back_to_external_store() {
        let mut shared = MemorySessionStore::new();
        shared.set("k", "from-host").unwrap();

        let mut kv = KvStore::with_external(16, shared);
        assert_eq!(kv.retrieve("k").unwrap().as_deref(), Some("from-host"));
    }

    #[test]
    fn local_only_never_evicts() {
        let mut kv = KvStore::local_only(2);
        for i in 0..5 {
            kv.store(&format!("k{i}"), "v", true).unwrap();
        }
        for i in 0..5 {
            assert_eq!(kv.retrieve(&format!("k{i}")).unwrap().as_deref(), Some("v"));
        }
    }

    #[test]
    fn evicted_entries_are_read_back_from_external_store() {
        let mut kv = KvStore::with_external(2, MemorySessionStore::new());
        for i in 0..5 {
            kv.store(&format!("k{i}"), "v", true).unwrap();
        }
        assert_eq!(kv.retrieve("k0").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn attach_copies_local_entries_into_store() {
        let mut kv = KvStore::local_only(2);
        for i in 0..3 {
            kv.store(&format!("k{i}"), "v", true).unwrap();
        }

        let recorder = RecordingStore::new();
        kv.attach(recorder.clone()).unwrap();
        assert_eq!(recorder.commits(), 1);
        for i in 0..3 {
            assert_eq!(recorder.durable(&format!("k{i}")).as_deref(), Some("v"));
        }

        // The now-bounded local cache evicts, the store still answers
        kv.store("k3", "v", true).unwrap();
        for i in 0..4 {
            assert_eq!(kv.retrieve(&format!("k{i}")).unwrap().as_deref(), Some("v"));
        }
    }

    #[test]
    fn failed_attach_keeps_local_cache() {
        let mut kv = KvStore::local_only(2);
        kv.store("k", "v", true).unwrap();

        let recorder = RecordingStore::new();
        recorder.fail_sets();
        assert!(kv.attach(recorder).is_err());
        assert!(!kv.has_external());
        assert_eq!(kv.retrieve("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn detached_store_stops_eviction() {
        let recorder = RecordingStore::new();
        let mut kv = KvStore::with_external(2, recorder.clone());
        recorder.fail_sets();
        assert!(kv.store("k0", "v", true).is_err());

        for i in 1..5 {
            kv.store(&format!("k{i}"), "v", true).unwrap();
        }
        for i in 0..5 {
            assert_eq!(kv.retrieve(&format!("k{i}")).unwrap().as_deref(), Some("v"));
        }
    }

    #[test]
    fn empty_values_are_misses() {
        let mut kv = KvStore::local_only(16);
        kv.store("k", "", true).unwrap();
        assert!(kv.retrieve("k").unwrap().is_none());
    }

    #[test]
    fn persist_controls_durable_commit() {
        let recorder = RecordingStore::new();
        let mut kv = KvStore::with_external(16, recorder.clone());

        kv.store("a", "1", false).unwrap();
        assert_eq!(recorder.commits(), 0);
        assert!(recorder.durable("a").is_none());

        kv.store("b", "2", true).unwrap();
        assert_eq!(recorder.commits(), 1);
        assert_eq!(recorder.durable("a").as_deref(), Some("1"));
    }

    #[test]
    fn batch_defers_to_a_single_commit() {
        let recorder = RecordingStore::new();
        let mut kv = KvStore::with_external(16, recorder.clone());

        kv.begin_batch();
        for i in 0..5 {
            kv.store(&format!("k{i}"), "v", true).unwrap();
        }
        assert_eq!(recorder.commits(), 0);
        kv.commit_batch().unwrap();

        assert_eq!(recorder.commits(), 1);
        assert_eq!(recorder.durable("k4").as_deref(), Some("v"));
    }

    #[test]
    fn empty_batch_does_not_commit() {
        let recorder = RecordingStore::new();
        let mut kv = KvStore::with_external(16, recorder.clone());
        kv.begin_batch();
        kv.commit_batch().unwrap();
        assert_eq!(recorder.commits(), 0);
    }

    #[test]
    fn invalidate_prefix_falls_back_to_enumeration() {
        let host = MemorySessionStore::new();
        let mut kv = KvStore::with_external(16, host.clone());
        kv.store("CRYPTO_BLOCK:a:m", "1", true).unwrap();
        kv.store("USERNAME:ip:site", "a", true).unwrap();

        assert_eq!(kv.invalidate_prefix("CRYPTO_BLOCK:").unwrap(), 1);
        assert!(kv.retrieve("CRYPTO_BLOCK:a:m").unwrap().is_none());
        assert_eq!(host.keys().unwrap(), vec!["USERNAME:ip:site".to_string()]);
    }

    #[test]
    fn invalidate_prefix_uses_bulk_clear_when_available() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbSessionStore::open(&dir.path().join("s.redb")).unwrap();
        let observer = store.share();

        let mut kv = KvStore::with_external(16, store);
        kv.store("CRYPTO_BLOCK:a:m", "1", true).unwrap();
        kv.store("CRYPTO_BLOCK:a:n", "2", true).unwrap();

        assert_eq!(kv.invalidate_prefix("CRYPTO_BLOCK:").unwrap(), 2);
        assert!(observer.get("CRYPTO_BLOCK:a:m").unwrap().is_none());
    }

    #[test]
    fn external_failure_is_reported_once_then_local_only() {
        let recorder = RecordingStore::new();
        let mut kv = KvStore::with_external(16, recorder.clone());
        kv.store("k", "v", true).unwrap();

        recorder.fail_sets();
        assert!(kv.store("k2", "v2", true).is_err());
        assert!(!kv.has_external());

        // Local cache kept both writes and keeps working
        assert_eq!(kv.retrieve("k").unwrap().as_deref(), Some("v"));
        assert_eq!(kv.retrieve("k2").unwrap().as_deref(), Some("v2"));
        kv.store("k3", "v3", true).unwrap();
        assert_eq!(kv.retrieve("k3").unwrap().as_deref(), Some("v3"));
    }

    #[test]
    fn external_read_failure_propagates() {
        let recorder = RecordingStore::new();
        recorder.fail_gets();
        let mut kv = KvStore::with_external(16, recorder);

        assert!(kv.retrieve("k").is_err());
        assert!(kv.retrieve("k").unwrap().is_none());
    }
}
