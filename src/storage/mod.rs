// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Storage
//!
//! Where cached identity state and crypto blocks live.
//!
//! ## Layers
//!
//! ```text
//! KvStore
//!   ├── LocalCache          always present, process-local LRU
//!   └── dyn SessionStore    optional, supplied by the host
//!         ├── MemorySessionStore   shared in-memory session
//!         └── RedbSessionStore     durable, staged commits, bulk clear
//! ```
//!
//! Keys are namespaced by kind (see [`keys`]); values are UTF-8 strings.
//! Structured values such as running users are stored as JSON.

pub mod keys;
pub mod kv;
pub mod local;
pub mod redb_store;
pub mod session_store;

pub use kv::KvStore;
pub use local::LocalCache;
pub use redb_store::RedbSessionStore;
pub use session_store::{BulkClear, MemorySessionStore, SessionStore, StoreError, StoreResult};
