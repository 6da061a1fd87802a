// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the `start_session` endpoint.

use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{CoreApi, RemoteError};
use crate::config::ClientSettings;
use crate::models::{CryptoBlock, RunningUser, SessionStart, StartSessionRequest};

#[derive(Debug, Clone)]
pub struct HttpCoreApi {
    start_session_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct StartSessionResponse {
    user_id: String,
    running_user: RunningUser,
    #[serde(default)]
    crypto_block: Option<String>,
}

impl HttpCoreApi {
    pub fn new(settings: &ClientSettings) -> Result<Self, RemoteError> {
        let start_session_url = settings.ext_start_session_url.trim().to_string();
        if !start_session_url.starts_with("https://") && !start_session_url.starts_with("http://")
        {
            return Err(RemoteError::Config(format!(
                "start session URL is not an HTTP(S) URL: {start_session_url}"
            )));
        }

        let http = Client::builder()
            .timeout(settings.api_request_timeout)
            .build()
            .map_err(|e| RemoteError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            start_session_url,
            http,
        })
    }

    pub fn start_session_url(&self) -> &str {
        &self.start_session_url
    }
}

impl CoreApi for HttpCoreApi {
    async fn start_session(
        &self,
        request: &StartSessionRequest,
    ) -> Result<SessionStart, RemoteError> {
        let form = build_form(request);

        let mut builder = self.http.post(&self.start_session_url).form(&form);
        if let Some(lang) = &request.accept_language {
            builder = builder.header("Accept-Language", lang);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RemoteError::Request(format!("start_session failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Auth(format!("start_session returned {status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Request(format!(
                "start_session returned {status}: {body}"
            )));
        }

        let body: StartSessionResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(format!("start_session invalid JSON: {e}")))?;

        let start = into_session_start(body)?;
        info!(
            username = %start.username,
            anonymous = request.is_anonymous(),
            has_crypto_block = start.crypto_block.is_some(),
            "Remote session established"
        );
        Ok(start)
    }
}

fn build_form(request: &StartSessionRequest) -> HashMap<&'static str, String> {
    let mut form = HashMap::new();
    let fields = [
        ("user_id", &request.username),
        ("user_passwd", &request.password),
        ("remote_ip", &request.remote_ip),
        ("remote_site", &request.remote_site),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            form.insert(name, value.clone());
        }
    }
    form
}

fn into_session_start(body: StartSessionResponse) -> Result<SessionStart, RemoteError> {
    let username = body.user_id.trim().to_string();
    if username.is_empty() {
        return Err(RemoteError::InvalidResponse(
            "start_session response did not include user_id".to_string(),
        ));
    }

    Ok(SessionStart {
        username,
        running_user: body.running_user,
        crypto_block: body
            .crypto_block
            .filter(|b| !b.is_empty())
            .map(CryptoBlock::new),
    })
}
