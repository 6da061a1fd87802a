// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote API clients.
//!
//! The cache layer only depends on [`CoreApi`]. Every other remote operation
//! takes an optional crypto block and may return a new one; those calls live
//! with the host and never pass through here.

pub mod core_api;

use std::future::Future;

use crate::models::{SessionStart, StartSessionRequest};

pub use core_api::HttpCoreApi;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("core API configuration invalid: {0}")]
    Config(String),

    #[error("core API rejected credentials: {0}")]
    Auth(String),

    #[error("core API request failed: {0}")]
    Request(String),

    #[error("core API response was invalid: {0}")]
    InvalidResponse(String),
}

/// Remote side of session bootstrap.
pub trait CoreApi: Send + Sync {
    /// Establish a session for the given credentials, or a guest session
    /// when the request carries no username.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network request fails or times out
    /// - Credentials are rejected
    /// - The response cannot be decoded
    fn start_session(
        &self,
        request: &StartSessionRequest,
    ) -> impl Future<Output = Result<SessionStart, RemoteError>> + Send;
}

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::{CoreApi, RemoteError};
    use crate::models::{CryptoBlock, RunningUser, SessionStart, StartSessionRequest};

    /// Counting `CoreApi` double. Anonymous starts issue `guest-N`;
    /// credentialed starts echo the username back.
    #[derive(Clone, Default)]
    pub struct MockCoreApi {
        calls: Arc<AtomicUsize>,
        pub fail: bool,
        pub without_block: bool,
        pub requests: Arc<Mutex<Vec<StartSessionRequest>>>,
    }

    impl MockCoreApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn without_block() -> Self {
            Self {
                without_block: true,
                ..Self::default()
            }
        }

        /// `start_session` calls made through this double or any clone.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CoreApi for MockCoreApi {
        async fn start_session(
            &self,
            request: &StartSessionRequest,
        ) -> Result<SessionStart, RemoteError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(RemoteError::Request("connection refused".to_string()));
            }

            let username = request
                .username
                .clone()
                .unwrap_or_else(|| format!("guest-{n}"));
            Ok(SessionStart {
                crypto_block: (!self.without_block)
                    .then(|| CryptoBlock::new(format!("start-{username}-{n}"))),
                running_user: RunningUser {
                    default_lang_code: "en".to_string(),
                    restrict_group: format!("group-{username}"),
                    content_language: Some("en-GB".to_string()),
                },
                username,
            })
        }
    }
}
