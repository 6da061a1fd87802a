// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TicketSwitch Session - identity and crypto-block cache
//!
//! The TicketSwitch XML Core API is stateless: reservation and purchase
//! flows carry their state in opaque "crypto blocks" that each response
//! hands back and the next call must replay. This crate keeps track of
//! those blocks per caller identity, bootstrapping a remote session when no
//! identity is known yet.
//!
//! ## Modules
//!
//! - `session` - [`TicketSession`], the per-caller owner of all state
//! - `crypto` - crypto-block get/set, per method and per transactional object
//! - `identity` - username resolution and running-user caching
//! - `bootstrap` - the single remote `start_session` call per lookup chain
//! - `storage` - local LRU plus optional host session store (memory, redb)
//! - `providers` - remote API client (reqwest)

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod logging;
pub mod models;
pub mod providers;
pub mod session;
pub mod storage;

pub use config::ClientSettings;
pub use context::CallerContext;
pub use crypto::CacheKey;
pub use error::{SessionError, SessionResult};
pub use models::{CryptoBlock, RunningUser, SessionStart, START_SESSION};
pub use providers::{CoreApi, HttpCoreApi, RemoteError};
pub use session::TicketSession;
pub use storage::{MemorySessionStore, RedbSessionStore, SessionStore, StoreError};
