// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ticket Session
//!
//! [`TicketSession`] owns one caller's view of the remote API: the caller
//! context, the resolved username, the running user and the two-tier store
//! holding cached identity state and crypto blocks.
//!
//! ## Lifecycle
//!
//! 1. Construct with a [`CoreApi`] and [`ClientSettings`]
//! 2. Optionally attach a host [`SessionStore`]
//! 3. [`TicketSession::reconfigure`] whenever the caller context changes;
//!    switching identity purges every cached crypto block
//! 4. Resolve identity lazily: explicit username, cached username for the
//!    caller's origin, then a remote bootstrap
//!
//! Crypto-block operations live in [`crate::crypto`].

use tracing::info;

use crate::bootstrap::BootstrapState;
use crate::config::ClientSettings;
use crate::context::CallerContext;
use crate::error::SessionResult;
use crate::identity::{self, Identity};
use crate::models::{RunningUser, SessionStart};
use crate::providers::CoreApi;
use crate::storage::{keys, KvStore, SessionStore};

pub struct TicketSession<A: CoreApi> {
    api: A,
    settings: ClientSettings,
    context: CallerContext,
    pub(crate) kv: KvStore,
    username: Option<String>,
    running_user: Option<RunningUser>,
}

impl<A: CoreApi> TicketSession<A> {
    /// Anonymous session with a process-local cache only.
    pub fn new(api: A, settings: ClientSettings) -> Self {
        let kv = KvStore::local_only(settings.local_cache_capacity);
        Self {
            api,
            settings,
            context: CallerContext::anonymous(),
            kv,
            username: None,
            running_user: None,
        }
    }

    /// Session backed by a host store, configured for `context`.
    ///
    /// # Errors
    ///
    /// Returns error if the host store fails while resolving the cached
    /// username for the caller's origin.
    pub fn with_store(
        api: A,
        settings: ClientSettings,
        store: impl SessionStore + 'static,
        context: CallerContext,
    ) -> SessionResult<Self> {
        let mut session = Self::new(api, settings);
        session.attach_session_store(store)?;
        session.reconfigure(context)?;
        Ok(session)
    }

    /// Attach (or replace) the host-provided session store. Anything cached
    /// so far is copied into it.
    ///
    /// # Errors
    ///
    /// Returns error if the store rejects the copy. The session then keeps
    /// running on its local cache.
    pub fn attach_session_store(
        &mut self,
        store: impl SessionStore + 'static,
    ) -> SessionResult<()> {
        self.kv.attach(store)?;
        Ok(())
    }

    pub fn has_session_store(&self) -> bool {
        self.kv.has_external()
    }

    pub fn core_api(&self) -> &A {
        &self.api
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn context(&self) -> &CallerContext {
        &self.context
    }

    /// Username resolved so far, without touching the cache or the API.
    pub fn current_username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Adopt a new caller context.
    ///
    /// Without an explicit username, the username cached for the new origin
    /// is used. If the previous context carried a username, remote IP or
    /// remote site that the new one does not match, every cached crypto
    /// block is purged before the switch. The running user is always
    /// dropped and re-resolved on demand.
    ///
    /// Returns whether the identity switched.
    ///
    /// # Errors
    ///
    /// Returns error if the host store fails during the lookup or the purge.
    /// The previous context stays in effect in that case.
    pub fn reconfigure(&mut self, context: CallerContext) -> SessionResult<bool> {
        let mut username = context.username().map(str::to_string);
        if username.is_none() {
            if let Some((remote_ip, remote_site)) = context.origin() {
                username = identity::cached_username(&mut self.kv, remote_ip, remote_site)?;
            }
        }

        let switched = identity_switched(
            self.username.as_deref(),
            &self.context,
            username.as_deref(),
            &context,
        );
        if switched {
            let purged = self.kv.invalidate_prefix(&keys::crypto_namespace())?;
            info!(
                previous = self.username.as_deref().unwrap_or("<none>"),
                current = username.as_deref().unwrap_or("<none>"),
                purged,
                "Caller identity changed, crypto blocks cleared"
            );
        }

        self.context = context;
        self.username = username;
        self.running_user = None;
        Ok(switched)
    }

    /// Resolved username, bootstrapping a session if nothing is known.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SessionError::Bootstrap`] if the remote call fails,
    /// or [`crate::SessionError::Storage`] if the host store fails.
    pub async fn username(&mut self) -> SessionResult<String> {
        let mut chain = BootstrapState::default();
        self.ensure_identity(&mut chain).await
    }

    /// Running user for the resolved username: in memory, then cached, then
    /// from a fresh bootstrap.
    pub async fn running_user(&mut self) -> SessionResult<RunningUser> {
        if let Some(running_user) = &self.running_user {
            return Ok(running_user.clone());
        }

        let mut chain = BootstrapState::default();
        let username = self.ensure_identity(&mut chain).await?;
        if let Some(running_user) = identity::cached_running_user(&mut self.kv, &username)? {
            self.running_user = Some(running_user.clone());
            return Ok(running_user);
        }

        let start = self.bootstrap(&mut chain).await?;
        Ok(start.running_user)
    }

    pub async fn restrict_group(&mut self) -> SessionResult<String> {
        Ok(self.running_user().await?.restrict_group)
    }

    pub async fn default_language_code(&mut self) -> SessionResult<String> {
        Ok(self.running_user().await?.default_lang_code)
    }

    /// Language the API answered in, when it reported one.
    pub async fn content_language(&mut self) -> SessionResult<Option<String>> {
        Ok(self.running_user().await?.content_language)
    }

    /// Username for this lookup chain, bootstrapping through `chain` when
    /// neither memory, context nor cache knows one.
    pub(crate) async fn ensure_identity(
        &mut self,
        chain: &mut BootstrapState,
    ) -> SessionResult<String> {
        if let Some(username) = &self.username {
            return Ok(username.clone());
        }

        if let Identity::Known(username) = identity::resolve_username(&self.context, &mut self.kv)? {
            self.username = Some(username.clone());
            return Ok(username);
        }

        Ok(self.bootstrap(chain).await?.username)
    }

    /// Bootstrap through `chain` and adopt the result.
    pub(crate) async fn bootstrap(
        &mut self,
        chain: &mut BootstrapState,
    ) -> SessionResult<SessionStart> {
        let start = chain
            .ensure(
                &self.api,
                &self.context,
                self.username.as_deref(),
                &mut self.kv,
            )
            .await?;

        self.username = Some(start.username.clone());
        self.running_user = Some(start.running_user.clone());
        Ok(start)
    }
}

fn identity_switched(
    old_username: Option<&str>,
    old: &CallerContext,
    new_username: Option<&str>,
    new: &CallerContext,
) -> bool {
    fn changed(old: Option<&str>, new: Option<&str>) -> bool {
        old.is_some() && old != new
    }

    changed(old_username, new_username)
        || changed(old.remote_ip(), new.remote_ip())
        || changed(old.remote_site(), new.remote_site())
}
