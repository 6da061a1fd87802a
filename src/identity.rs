// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity resolution and the identity half of the cache.
//!
//! A caller is identified either by an explicit username, or by the username
//! previously issued to its (remote IP, remote site) pair. Running-user
//! descriptors are cached per username as JSON.

use tracing::{debug, warn};

use crate::context::CallerContext;
use crate::models::RunningUser;
use crate::storage::{keys, KvStore, StoreResult};

/// Outcome of identity resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Known(String),
    /// No explicit or cached username; a session bootstrap is required.
    Unavailable,
}

impl Identity {
    pub fn username(&self) -> Option<&str> {
        match self {
            Identity::Known(username) => Some(username),
            Identity::Unavailable => None,
        }
    }
}

/// Explicit username first, then the username cached for the caller's
/// origin. Any cached string is trusted as-is.
pub fn resolve_username(context: &CallerContext, kv: &mut KvStore) -> StoreResult<Identity> {
    if let Some(username) = context.username() {
        return Ok(Identity::Known(username.to_string()));
    }

    if let Some((remote_ip, remote_site)) = context.origin() {
        if let Some(username) = cached_username(kv, remote_ip, remote_site)? {
            debug!(remote_ip, remote_site, "Resolved username from cache");
            return Ok(Identity::Known(username));
        }
    }

    Ok(Identity::Unavailable)
}

pub fn cached_username(
    kv: &mut KvStore,
    remote_ip: &str,
    remote_site: &str,
) -> StoreResult<Option<String>> {
    kv.retrieve(&keys::username_key(remote_ip, remote_site))
}

pub fn cache_username(
    kv: &mut KvStore,
    remote_ip: &str,
    remote_site: &str,
    username: &str,
    persist: bool,
) -> StoreResult<()> {
    kv.store(&keys::username_key(remote_ip, remote_site), username, persist)
}

/// Cached running user for `username`. A value that no longer decodes is
/// reported and treated as absent.
pub fn cached_running_user(kv: &mut KvStore, username: &str) -> StoreResult<Option<RunningUser>> {
    let Some(raw) = kv.retrieve(&keys::running_user_key(username))? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(running_user) => Ok(Some(running_user)),
        Err(e) => {
            warn!(username, error = %e, "Ignoring malformed cached running user");
            Ok(None)
        }
    }
}

pub fn cache_running_user(
    kv: &mut KvStore,
    username: &str,
    running_user: &RunningUser,
    persist: bool,
) -> StoreResult<()> {
    let encoded = match serde_json::to_string(running_user) {
        Ok(encoded) => encoded,
        Err(e) => {
            warn!(username, error = %e, "Could not encode running user, not caching");
            return Ok(());
        }
    };
    kv.store(&keys::running_user_key(username), &encoded, persist)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin_ctx() -> CallerContext {
        CallerContext::builder()
            .remote_ip("10.0.0.1")
            .remote_site("tickets.example.com")
            .build()
    }

    #[test]
    fn explicit_username_skips_cache() {
        let mut kv = KvStore::local_only(16);
        cache_username(&mut kv, "10.0.0.1", "tickets.example.com", "cached", true).unwrap();

        let ctx = CallerContext::builder()
            .username("explicit")
            .remote_ip("10.0.0.1")
            .remote_site("tickets.example.com")
            .build();
        assert_eq!(
            resolve_username(&ctx, &mut kv).unwrap(),
            Identity::Known("explicit".to_string())
        );
    }

    #[test]
    fn cached_username_for_origin() {
        let mut kv = KvStore::local_only(16);
        assert_eq!(
            resolve_username(&origin_ctx(), &mut kv).unwrap(),
            Identity::Unavailable
        );

        cache_username(&mut kv, "10.0.0.1", "tickets.example.com", "guest-7", true).unwrap();
        let identity = resolve_username(&origin_ctx(), &mut kv).unwrap();
        assert_eq!(identity.username(), Some("guest-7"));
    }

    #[test]
    fn partial_origin_never_hits_cache() {
        let mut kv = KvStore::local_only(16);
        cache_username(&mut kv, "10.0.0.1", "tickets.example.com", "guest-7", true).unwrap();

        let ctx = CallerContext::builder().remote_ip("10.0.0.1").build();
        assert_eq!(
            resolve_username(&ctx, &mut kv).unwrap(),
            Identity::Unavailable
        );
    }

    #[test]
    fn running_user_round_trip() {
        let mut kv = KvStore::local_only(16);
        let ru = RunningUser {
            default_lang_code: "de".to_string(),
            restrict_group: "partners".to_string(),
            content_language: Some("de".to_string()),
        };
        cache_running_user(&mut kv, "agent", &ru, true).unwrap();
        assert_eq!(cached_running_user(&mut kv, "agent").unwrap(), Some(ru));
        assert_eq!(cached_running_user(&mut kv, "other").unwrap(), None);
    }

    #[test]
    fn malformed_running_user_is_a_miss() {
        let mut kv = KvStore::local_only(16);
        kv.store(&keys::running_user_key("agent"), "{not json", true)
            .unwrap();
        assert_eq!(cached_running_user(&mut kv, "agent").unwrap(), None);
    }
}
