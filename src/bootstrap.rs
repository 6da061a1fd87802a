// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session bootstrap.
//!
//! The remote `start_session` call is not idempotent: an anonymous start
//! provisions a fresh guest account every time. [`BootstrapState`] is
//! threaded through one lookup chain so the call happens at most once per
//! chain, and its result is reused by every step that needs it.
//!
//! Cache writes happen only after the remote call succeeds, inside a single
//! store batch, so a failed bootstrap leaves nothing behind and a successful
//! one costs one durable commit.

use tracing::info;

use crate::context::CallerContext;
use crate::error::SessionResult;
use crate::identity;
use crate::models::{SessionStart, StartSessionRequest, START_SESSION};
use crate::providers::CoreApi;
use crate::storage::{keys, KvStore, StoreResult};

#[derive(Debug, Default)]
pub enum BootstrapState {
    #[default]
    NoSession,
    Established(SessionStart),
}

impl BootstrapState {
    pub fn established(&self) -> Option<&SessionStart> {
        match self {
            BootstrapState::Established(start) => Some(start),
            BootstrapState::NoSession => None,
        }
    }

    /// Run the bootstrap unless this chain already did.
    ///
    /// `known_username` is the identity the caller currently believes in; it
    /// is sent as the session username and decides whether the returned
    /// username must be re-cached for the caller's origin.
    pub async fn ensure<A: CoreApi>(
        &mut self,
        api: &A,
        context: &CallerContext,
        known_username: Option<&str>,
        kv: &mut KvStore,
    ) -> SessionResult<SessionStart> {
        if let BootstrapState::Established(start) = self {
            return Ok(start.clone());
        }

        let request = StartSessionRequest {
            username: known_username.map(str::to_string),
            password: context.password().map(str::to_string),
            remote_ip: context.remote_ip().map(str::to_string),
            remote_site: context.remote_site().map(str::to_string),
            accept_language: context.accept_language().map(str::to_string),
        };

        let start = api.start_session(&request).await?;
        info!(
            username = %start.username,
            previous = known_username.unwrap_or("<none>"),
            "Session bootstrapped"
        );

        kv.begin_batch();
        let written = record(kv, context, known_username, &start);
        let committed = kv.commit_batch();
        written?;
        committed?;

        *self = BootstrapState::Established(start.clone());
        Ok(start)
    }
}

fn record(
    kv: &mut KvStore,
    context: &CallerContext,
    known_username: Option<&str>,
    start: &SessionStart,
) -> StoreResult<()> {
    if known_username != Some(start.username.as_str()) {
        if let Some((remote_ip, remote_site)) = context.origin() {
            identity::cache_username(kv, remote_ip, remote_site, &start.username, true)?;
        }
    }

    identity::cache_running_user(kv, &start.username, &start.running_user, true)?;

    if let Some(block) = &start.crypto_block {
        kv.store(
            &keys::crypto_key(&start.username, START_SESSION),
            block.as_str(),
            true,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockCoreApi;
    use crate::storage::kv::testing::RecordingStore;

    fn origin_ctx() -> CallerContext {
        CallerContext::builder()
            .remote_ip("10.0.0.1")
            .remote_site("tickets.example.com")
            .build()
    }

    #[tokio::test]
    async fn anonymous_bootstrap_caches_identity_and_block() {
        let api = MockCoreApi::new();
        let recorder = RecordingStore::new();
        let mut kv = KvStore::with_external(16, recorder.clone());
        let mut state = BootstrapState::default();

        let start = state.ensure(&api, &origin_ctx(), None, &mut kv).await.unwrap();
        assert_eq!(start.username, "guest-1");
        assert_eq!(api.calls(), 1);

        let username_key = keys::username_key("10.0.0.1", "tickets.example.com");
        assert_eq!(kv.retrieve(&username_key).unwrap().as_deref(), Some("guest-1"));
        assert_eq!(
            kv.retrieve(&keys::crypto_key("guest-1", START_SESSION))
                .unwrap()
                .as_deref(),
            Some("start-guest-1-1")
        );
        assert!(identity::cached_running_user(&mut kv, "guest-1")
            .unwrap()
            .is_some());

        // All three writes share one durable commit
        assert_eq!(recorder.commits(), 1);
        assert_eq!(recorder.durable(&username_key).as_deref(), Some("guest-1"));
    }

    #[tokio::test]
    async fn second_ensure_reuses_result() {
        let api = MockCoreApi::new();
        let mut kv = KvStore::local_only(16);
        let mut state = BootstrapState::default();

        let first = state.ensure(&api, &origin_ctx(), None, &mut kv).await.unwrap();
        let second = state.ensure(&api, &origin_ctx(), None, &mut kv).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(api.calls(), 1);
        assert!(state.established().is_some());
    }

    #[tokio::test]
    async fn same_username_is_not_recached() {
        let api = MockCoreApi::new();
        let mut kv = KvStore::local_only(16);
        let ctx = CallerContext::builder()
            .username("agent")
            .password("pw")
            .remote_ip("10.0.0.1")
            .remote_site("tickets.example.com")
            .build();

        let start = BootstrapState::default()
            .ensure(&api, &ctx, Some("agent"), &mut kv)
            .await
            .unwrap();
        assert_eq!(start.username, "agent");
        assert!(kv
            .retrieve(&keys::username_key("10.0.0.1", "tickets.example.com"))
            .unwrap()
            .is_none());

        let sent = api.requests.lock().unwrap()[0].clone();
        assert_eq!(sent.username.as_deref(), Some("agent"));
        assert_eq!(sent.password.as_deref(), Some("pw"));
    }

    #[tokio::test]
    async fn failed_bootstrap_writes_nothing() {
        let api = MockCoreApi::failing();
        let recorder = RecordingStore::new();
        let mut kv = KvStore::with_external(16, recorder.clone());
        let mut state = BootstrapState::default();

        let err = state
            .ensure(&api, &origin_ctx(), None, &mut kv)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "bootstrap_failure");
        assert!(state.established().is_none());
        assert!(recorder.state.lock().unwrap().entries.is_empty());
        assert!(kv
            .retrieve(&keys::username_key("10.0.0.1", "tickets.example.com"))
            .unwrap()
            .is_none());
    }
}
