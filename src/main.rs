// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session probe.
//!
//! Resolves the configured caller's identity against the live API, fetching
//! (or reusing) the `start_session` crypto block, and persists the result in
//! the durable session store under `DATA_DIR`.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info};

use ticketswitch_session::config::{env_or_default, DATA_DIR_ENV, DEFAULT_DATA_DIR};
use ticketswitch_session::logging::init_tracing;
use ticketswitch_session::{
    CallerContext, ClientSettings, HttpCoreApi, RedbSessionStore, SessionError, TicketSession,
    START_SESSION,
};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!(error = %message, "Session probe failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), String> {
    let settings = ClientSettings::from_env();
    let context = CallerContext::from_env();

    let data_dir = PathBuf::from(env_or_default(DATA_DIR_ENV, DEFAULT_DATA_DIR));
    std::fs::create_dir_all(&data_dir)
        .map_err(|e| format!("cannot create {}: {e}", data_dir.display()))?;
    let store_path = data_dir.join("sessions.redb");
    let store = RedbSessionStore::open(&store_path)
        .map_err(|e| format!("cannot open {}: {e}", store_path.display()))?;

    let api = HttpCoreApi::new(&settings).map_err(|e| e.to_string())?;
    info!(endpoint = api.start_session_url(), "Probing session bootstrap");

    let mut session = TicketSession::with_store(api, settings, store, context)
        .map_err(|e: SessionError| e.to_string())?;

    let block = session
        .get_block(START_SESSION, true)
        .await
        .map_err(|e| format!("{} ({})", e, e.error_code()))?;
    let username = session.username().await.map_err(|e| e.to_string())?;
    let restrict_group = session.restrict_group().await.map_err(|e| e.to_string())?;

    info!(
        username = %username,
        restrict_group = %restrict_group,
        has_crypto_block = block.is_some(),
        "Session ready"
    );
    Ok(())
}
