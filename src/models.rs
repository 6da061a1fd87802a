// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Data Models
//!
//! Values that flow between the remote client and the cache layer.
//!
//! - [`CryptoBlock`]: opaque continuation token, stored and replayed verbatim
//! - [`RunningUser`]: the remote session descriptor for a username
//! - [`SessionStart`]: everything a successful `start_session` call yields
//! - [`StartSessionRequest`]: credentials (or anonymous origin) for that call

use serde::{Deserialize, Serialize};

/// Remote method name of the bootstrap call.
pub const START_SESSION: &str = "start_session";

// =============================================================================
// Crypto Block
// =============================================================================

/// Opaque continuation token returned by the remote API.
///
/// The layer never inspects the contents; it is cached and echoed back on the
/// next related call exactly as received. An empty block carries no state
/// and is never returned from the cache: storing one reads back as absent.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct CryptoBlock(String);

impl CryptoBlock {
    pub fn new(value: impl Into<String>) -> Self {
        CryptoBlock(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

// Tokens grant access to in-flight transactions; keep them out of logs.
impl std::fmt::Debug for CryptoBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CryptoBlock(<{} bytes>)", self.0.len())
    }
}

impl From<String> for CryptoBlock {
    fn from(value: String) -> Self {
        CryptoBlock(value)
    }
}

impl From<&str> for CryptoBlock {
    fn from(value: &str) -> Self {
        CryptoBlock(value.to_string())
    }
}

// =============================================================================
// Running User
// =============================================================================

/// Remote session descriptor associated with a resolved username.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunningUser {
    /// Default language code of the account (e.g. `en`)
    pub default_lang_code: String,
    /// Access-restriction grouping the account belongs to
    pub restrict_group: String,
    /// Language the API answered in, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
}

// =============================================================================
// Bootstrap Exchange
// =============================================================================

/// Input to the remote `start_session` call.
///
/// With no username this is an anonymous start, and the remote side issues
/// a guest account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartSessionRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub remote_ip: Option<String>,
    pub remote_site: Option<String>,
    pub accept_language: Option<String>,
}

impl StartSessionRequest {
    pub fn is_anonymous(&self) -> bool {
        self.username.is_none()
    }
}

/// Result of a successful `start_session` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStart {
    pub username: String,
    pub running_user: RunningUser,
    pub crypto_block: Option<CryptoBlock>,
}
