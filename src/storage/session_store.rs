// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Host-supplied session store abstraction.
//!
//! A host (typically a web framework) hands the layer whatever per-visitor
//! key-value surface it has. The layer only needs `get`/`set`/`remove` and
//! key enumeration. Two capabilities are optional:
//!
//! - **Durable commit**: [`SessionStore::commit`] flushes staged writes.
//!   Stores whose writes are durable immediately keep the default no-op.
//! - **Bulk clear**: a store that can drop a whole key prefix in one
//!   operation exposes it through [`SessionStore::bulk_clear`]. Otherwise
//!   the adapter enumerates keys and deletes matches one by one.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Error type for external session store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session store lock poisoned")]
    Poisoned,

    /// Failure reported by a host-provided store.
    #[error("session store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// External key-value surface provided by the embedding host.
pub trait SessionStore: Send {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()>;

    fn remove(&mut self, key: &str) -> StoreResult<()>;

    /// Every key currently visible through this store.
    fn keys(&self) -> StoreResult<Vec<String>>;

    /// Make previous writes durable.
    fn commit(&mut self) -> StoreResult<()> {
        Ok(())
    }

    /// Bulk prefix-clear capability, if this store has one.
    fn bulk_clear(&mut self) -> Option<&mut dyn BulkClear> {
        None
    }
}

/// Optional capability: remove every key under a prefix in one operation.
pub trait BulkClear {
    /// Returns the number of entries removed.
    fn clear_prefix(&mut self, prefix: &str) -> StoreResult<usize>;
}

// =============================================================================
// In-memory host session
// =============================================================================

/// Shared in-memory session, the shape of a typical web framework session.
///
/// Cloning yields another handle onto the same entries, so two
/// [`TicketSession`](crate::session::TicketSession)s built for the same
/// visitor see each other's writes. Writes are visible immediately and there
/// is no bulk clear.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.keys().cloned().collect())
    }
}
