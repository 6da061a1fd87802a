// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Errors surfaced by [`TicketSession`](crate::session::TicketSession).
//!
//! Only two things can fail from a caller's point of view: the remote
//! `start_session` call, and the host-supplied session store. Cache misses,
//! unknown identities and malformed cached values are not errors.

use crate::providers::RemoteError;
use crate::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The remote bootstrap call failed. No cache entry was written.
    #[error("unable to establish session: {0}")]
    Bootstrap(#[from] RemoteError),

    /// The external session store failed. The in-process cache is still
    /// valid and the store has been detached for the rest of the process.
    #[error("session store unavailable: {0}")]
    Storage(#[from] StoreError),
}

impl SessionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionError::Bootstrap(_) => "bootstrap_failure",
            SessionError::Storage(_) => "storage_unavailable",
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
