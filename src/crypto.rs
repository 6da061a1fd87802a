// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Crypto Block Cache
//!
//! Crypto blocks are cached per (username, method) and, for calls tied to a
//! transactional object such as a reservation or a purchase, per
//! (username, method, object key). A block is never read or written
//! without a resolved username, so blocks issued to one caller cannot be
//! replayed for another.
//!
//! ## Credential gating
//!
//! [`TicketSession::get_block`] with `require_credentials = false` is used
//! by operations that only need a block for anonymous callers. When the
//! caller supplied a password, those operations run on credentials alone and
//! no block (and no bootstrap) is involved.

use tracing::debug;

use crate::bootstrap::BootstrapState;
use crate::error::SessionResult;
use crate::models::{CryptoBlock, START_SESSION};
use crate::providers::CoreApi;
use crate::session::TicketSession;
use crate::storage::{keys, StoreResult};

/// Something a crypto block can be cached against.
pub trait CacheKey {
    /// Stable key identifying this object across sessions.
    fn cache_key(&self) -> String;
}

impl CacheKey for str {
    fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl CacheKey for String {
    fn cache_key(&self) -> String {
        self.clone()
    }
}

impl<T: CacheKey + ?Sized> CacheKey for &T {
    fn cache_key(&self) -> String {
        (**self).cache_key()
    }
}

impl<A: CoreApi> TicketSession<A> {
    /// Crypto block for `method`.
    ///
    /// - Cached block for (username, method), if any
    /// - For [`START_SESSION`] only, the block from a fresh bootstrap
    /// - Otherwise `None`
    ///
    /// At most one bootstrap happens per call, even if it returns no block.
    ///
    /// # Errors
    ///
    /// Returns error if a required bootstrap fails or the host store fails.
    pub async fn get_block(
        &mut self,
        method: &str,
        require_credentials: bool,
    ) -> SessionResult<Option<CryptoBlock>> {
        if !require_credentials && self.context().has_password() {
            debug!(method, "Caller has credentials, crypto block not needed");
            return Ok(None);
        }

        let mut chain = BootstrapState::default();
        let username = self.ensure_identity(&mut chain).await?;

        if let Some(value) = self.kv.retrieve(&keys::crypto_key(&username, method))? {
            return Ok(Some(CryptoBlock::new(value)));
        }

        if method == START_SESSION {
            let start = self.bootstrap(&mut chain).await?;
            return Ok(start.crypto_block);
        }

        Ok(None)
    }

    /// Cache `block` for `method` under the resolved username. An empty
    /// block is stored but reads back as absent.
    pub async fn set_block(&mut self, block: &CryptoBlock, method: &str) -> SessionResult<()> {
        let mut chain = BootstrapState::default();
        let username = self.ensure_identity(&mut chain).await?;

        self.kv
            .store(&keys::crypto_key(&username, method), block.as_str(), true)?;
        Ok(())
    }

    /// Crypto block cached for `method` on one transactional object. No
    /// credential gating applies.
    pub async fn get_block_for_object(
        &mut self,
        method: &str,
        object: &(impl CacheKey + ?Sized),
    ) -> SessionResult<Option<CryptoBlock>> {
        let mut chain = BootstrapState::default();
        let username = self.ensure_identity(&mut chain).await?;

        let key = keys::crypto_object_key(&username, method, &object.cache_key());
        Ok(self.kv.retrieve(&key)?.map(CryptoBlock::new))
    }

    pub async fn set_block_for_object(
        &mut self,
        block: &CryptoBlock,
        method: &str,
        object: &(impl CacheKey + ?Sized),
    ) -> SessionResult<()> {
        self.set_block_for_objects(block, method, std::slice::from_ref(&object))
            .await
    }

    /// Cache `block` against every object in `objects`.
    ///
    /// All writes share one durable commit of the host store, issued after
    /// the last write.
    pub async fn set_block_for_objects<O: CacheKey>(
        &mut self,
        block: &CryptoBlock,
        method: &str,
        objects: &[O],
    ) -> SessionResult<()> {
        if objects.is_empty() {
            return Ok(());
        }

        let mut chain = BootstrapState::default();
        let username = self.ensure_identity(&mut chain).await?;

        self.kv.begin_batch();
        let written = self.store_for_objects(&username, block, method, objects);
        let committed = self.kv.commit_batch();
        written?;
        committed?;

        debug!(method, objects = objects.len(), "Cached crypto block for objects");
        Ok(())
    }

    fn store_for_objects<O: CacheKey>(
        &mut self,
        username: &str,
        block: &CryptoBlock,
        method: &str,
        objects: &[O],
    ) -> StoreResult<()> {
        for object in objects {
            let key = keys::crypto_object_key(username, method, &object.cache_key());
            self.kv.store(&key, block.as_str(), true)?;
        }
        Ok(())
    }
}
