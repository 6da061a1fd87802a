// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Durable session store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `session_entries`: cache key → value (UTF-8 text)
//!
//! Writes are staged in memory and applied in a single write transaction on
//! [`SessionStore::commit`], so a batch of `persist = false` writes followed
//! by one commit costs one fsync.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use tracing::debug;

use super::session_store::{BulkClear, SessionStore, StoreResult};

const SESSION_ENTRIES: TableDefinition<&str, &str> = TableDefinition::new("session_entries");

/// Staged change: `Some(value)` to write, `None` to delete.
type Pending = BTreeMap<String, Option<String>>;

pub struct RedbSessionStore {
    db: Arc<Database>,
    pending: Pending,
}

impl RedbSessionStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SESSION_ENTRIES)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            pending: Pending::new(),
        })
    }

    /// Another handle on the same database with its own staging buffer.
    pub fn share(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            pending: Pending::new(),
        }
    }

    /// Number of staged, uncommitted changes.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn committed_get(&self, key: &str) -> StoreResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSION_ENTRIES)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    fn committed_keys(&self) -> StoreResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSION_ENTRIES)?;
        let mut keys = Vec::new();
        for entry in table.iter()? {
            let (key, _) = entry?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }
}

impl SessionStore for RedbSessionStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        if let Some(staged) = self.pending.get(key) {
            return Ok(staged.clone());
        }
        self.committed_get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.pending.insert(key.to_string(), Some(value.to_string()));
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.pending.insert(key.to_string(), None);
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys: BTreeMap<String, bool> = self
            .committed_keys()?
            .into_iter()
            .map(|k| (k, true))
            .collect();
        for (key, staged) in &self.pending {
            keys.insert(key.clone(), staged.is_some());
        }
        Ok(keys
            .into_iter()
            .filter_map(|(k, live)| live.then_some(k))
            .collect())
    }

    fn commit(&mut self) -> StoreResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSION_ENTRIES)?;
            for (key, staged) in &self.pending {
                match staged {
                    Some(value) => {
                        table.insert(key.as_str(), value.as_str())?;
                    }
                    None => {
                        table.remove(key.as_str())?;
                    }
                }
            }
        }
        write_txn.commit()?;

        debug!(entries = self.pending.len(), "Committed session store changes");
        self.pending.clear();
        Ok(())
    }

    fn bulk_clear(&mut self) -> Option<&mut dyn BulkClear> {
        Some(self)
    }
}

impl BulkClear for RedbSessionStore {
    /// Removes committed entries under `prefix` in one write transaction and
    /// discards any staged writes under it.
    fn clear_prefix(&mut self, prefix: &str) -> StoreResult<usize> {
        self.pending.retain(|key, _| !key.starts_with(prefix));

        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(SESSION_ENTRIES)?;
            let mut doomed = Vec::new();
            for entry in table.range(prefix..)? {
                let (key, _) = entry?;
                let key = key.value().to_string();
                if !key.starts_with(prefix) {
                    break;
                }
                doomed.push(key);
            }
            for key in &doomed {
                table.remove(key.as_str())?;
            }
            doomed.len()
        };
        write_txn.commit()?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreError;

    fn temp_store() -> (RedbSessionStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbSessionStore::open(&dir.path().join("sessions.redb")).unwrap();
        (store, dir)
    }

    #[test]
    fn open_reports_unusable_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let err = RedbSessionStore::open(&blocker.join("sessions.redb"))
            .err()
            .expect("open under a regular file must fail");
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn open_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("sessions.redb");
        assert!(RedbSessionStore::open(&path).is_ok());
        assert!(path.exists());
    }

    #[test]
    fn staged_writes_are_readable_before_commit() {
        let (mut store, _dir) = temp_store();
        store.set("k", "v").unwrap();

        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(store.pending_len(), 1);
        // Not yet visible to another handle
        assert!(store.share().get("k").unwrap().is_none());
    }

    #[test]
    fn commit_makes_writes_visible_to_other_handles() {
        let (mut store, _dir) = temp_store();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.commit().unwrap();

        let other = store.share();
        assert_eq!(other.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(other.get("b").unwrap().as_deref(), Some("2"));
        assert_eq!(store.pending_len(), 0);
    }

    #[test]
    fn committed_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.redb");
        {
            let mut store = RedbSessionStore::open(&path).unwrap();
            store.set("k", "v").unwrap();
            store.commit().unwrap();
        }
        let store = RedbSessionStore::open(&path).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn staged_remove_hides_committed_value() {
        let (mut store, _dir) = temp_store();
        store.set("k", "v").unwrap();
        store.commit().unwrap();

        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
        assert!(store.keys().unwrap().is_empty());

        store.commit().unwrap();
        assert!(store.share().get("k").unwrap().is_none());
    }

    #[test]
    fn clear_prefix_removes_only_matching_entries() {
        let (mut store, _dir) = temp_store();
        store.set("CRYPTO_BLOCK:a:m", "1").unwrap();
        store.set("CRYPTO_BLOCK:b:m", "2").unwrap();
        store.set("USERNAME:ip:site", "a").unwrap();
        store.commit().unwrap();
        store.set("CRYPTO_BLOCK:c:m", "staged").unwrap();

        let clear = store.bulk_clear().expect("redb store supports bulk clear");
        assert_eq!(clear.clear_prefix("CRYPTO_BLOCK:").unwrap(), 2);

        assert_eq!(store.keys().unwrap(), vec!["USERNAME:ip:site".to_string()]);
        assert_eq!(store.pending_len(), 0);
    }
}
