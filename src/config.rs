// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names and default values for the endpoint settings
//! shared by every [`TicketSession`](crate::session::TicketSession).
//! Settings are loaded from the environment by the probe binary; library
//! users usually build [`ClientSettings`] directly.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `TSW_API_URL` | XML Core API endpoint | `https://api.ticketswitch.com/cgi-bin/xml_core.exe` |
//! | `TSW_EXT_START_SESSION_URL` | Endpoint used for `start_session` | `https://api.ticketswitch.com/cgi-bin/xml_start_session.exe` |
//! | `TSW_API_REQUEST_TIMEOUT` | Remote call timeout in seconds | `60` |
//! | `TSW_NO_TIME_DESCR` | Text used when a performance has no time | `No time` |
//! | `TSW_DEFAULT_CONCESSION_DESCR` | Text used when a concession has no description | `Standard` |
//! | `TSW_LOCAL_CACHE_CAPACITY` | Max entries held in the in-process cache while a session store is attached | `4096` |
//! | `TSW_USERNAME` / `TSW_PASSWORD` | Explicit credentials (probe only) | unset |
//! | `TSW_REMOTE_IP` / `TSW_REMOTE_SITE` | Caller origin (probe only) | unset |
//! | `TSW_ACCEPT_LANGUAGE` | Caller `Accept-Language` (probe only) | unset |
//! | `DATA_DIR` | Directory holding the durable session database | `/data` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::time::Duration;

use tracing::warn;

pub const API_URL_ENV: &str = "TSW_API_URL";
pub const EXT_START_SESSION_URL_ENV: &str = "TSW_EXT_START_SESSION_URL";
pub const API_REQUEST_TIMEOUT_ENV: &str = "TSW_API_REQUEST_TIMEOUT";
pub const NO_TIME_DESCR_ENV: &str = "TSW_NO_TIME_DESCR";
pub const DEFAULT_CONCESSION_DESCR_ENV: &str = "TSW_DEFAULT_CONCESSION_DESCR";
pub const LOCAL_CACHE_CAPACITY_ENV: &str = "TSW_LOCAL_CACHE_CAPACITY";

pub const USERNAME_ENV: &str = "TSW_USERNAME";
pub const PASSWORD_ENV: &str = "TSW_PASSWORD";
pub const REMOTE_IP_ENV: &str = "TSW_REMOTE_IP";
pub const REMOTE_SITE_ENV: &str = "TSW_REMOTE_SITE";
pub const ACCEPT_LANGUAGE_ENV: &str = "TSW_ACCEPT_LANGUAGE";

/// Environment variable name for the directory holding `sessions.redb`.
///
/// # Default
/// `/data`
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = "/data";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_API_URL: &str = "https://api.ticketswitch.com/cgi-bin/xml_core.exe";
pub const DEFAULT_EXT_START_SESSION_URL: &str =
    "https://api.ticketswitch.com/cgi-bin/xml_start_session.exe";
pub const DEFAULT_API_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_NO_TIME_DESCR: &str = "No time";
pub const DEFAULT_CONCESSION_DESCR: &str = "Standard";
pub const DEFAULT_LOCAL_CACHE_CAPACITY: usize = 4096;

/// Endpoint and presentation settings.
///
/// Blank values passed through [`ClientSettings::builder`] are replaced by
/// the defaults above, so a host can forward optional form fields verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub url: String,
    pub ext_start_session_url: String,
    pub api_request_timeout: Duration,
    pub no_time_descr: String,
    pub default_concession_descr: String,
    pub local_cache_capacity: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            ext_start_session_url: DEFAULT_EXT_START_SESSION_URL.to_string(),
            api_request_timeout: DEFAULT_API_REQUEST_TIMEOUT,
            no_time_descr: DEFAULT_NO_TIME_DESCR.to_string(),
            default_concession_descr: DEFAULT_CONCESSION_DESCR.to_string(),
            local_cache_capacity: DEFAULT_LOCAL_CACHE_CAPACITY,
        }
    }
}

impl ClientSettings {
    pub fn builder() -> ClientSettingsBuilder {
        ClientSettingsBuilder::default()
    }

    /// Load settings from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let mut builder = Self::builder();
        if let Some(url) = env_optional(API_URL_ENV) {
            builder = builder.url(url);
        }
        if let Some(url) = env_optional(EXT_START_SESSION_URL_ENV) {
            builder = builder.ext_start_session_url(url);
        }
        if let Some(secs) = env_parsed::<u64>(API_REQUEST_TIMEOUT_ENV) {
            builder = builder.api_request_timeout(Duration::from_secs(secs));
        }
        if let Some(descr) = env_optional(NO_TIME_DESCR_ENV) {
            builder = builder.no_time_descr(descr);
        }
        if let Some(descr) = env_optional(DEFAULT_CONCESSION_DESCR_ENV) {
            builder = builder.default_concession_descr(descr);
        }
        if let Some(capacity) = env_parsed::<usize>(LOCAL_CACHE_CAPACITY_ENV) {
            builder = builder.local_cache_capacity(capacity);
        }
        builder.build()
    }
}

#[derive(Debug, Default, Clone)]
pub struct ClientSettingsBuilder {
    url: Option<String>,
    ext_start_session_url: Option<String>,
    api_request_timeout: Option<Duration>,
    no_time_descr: Option<String>,
    default_concession_descr: Option<String>,
    local_cache_capacity: Option<usize>,
}

impl ClientSettingsBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn ext_start_session_url(mut self, url: impl Into<String>) -> Self {
        self.ext_start_session_url = Some(url.into());
        self
    }

    pub fn api_request_timeout(mut self, timeout: Duration) -> Self {
        self.api_request_timeout = Some(timeout);
        self
    }

    pub fn no_time_descr(mut self, descr: impl Into<String>) -> Self {
        self.no_time_descr = Some(descr.into());
        self
    }

    pub fn default_concession_descr(mut self, descr: impl Into<String>) -> Self {
        self.default_concession_descr = Some(descr.into());
        self
    }

    pub fn local_cache_capacity(mut self, capacity: usize) -> Self {
        self.local_cache_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> ClientSettings {
        let defaults = ClientSettings::default();
        ClientSettings {
            url: non_blank(self.url).unwrap_or(defaults.url),
            ext_start_session_url: non_blank(self.ext_start_session_url)
                .unwrap_or(defaults.ext_start_session_url),
            api_request_timeout: self
                .api_request_timeout
                .filter(|t| !t.is_zero())
                .unwrap_or(defaults.api_request_timeout),
            no_time_descr: non_blank(self.no_time_descr).unwrap_or(defaults.no_time_descr),
            default_concession_descr: non_blank(self.default_concession_descr)
                .unwrap_or(defaults.default_concession_descr),
            local_cache_capacity: self
                .local_cache_capacity
                .filter(|c| *c > 0)
                .unwrap_or(defaults.local_cache_capacity),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read an environment variable, treating blank values as unset.
pub fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env_optional(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparseable setting, using default");
            None
        }
    }
}
