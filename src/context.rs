// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-caller identity inputs.

use crate::config::{
    env_optional, ACCEPT_LANGUAGE_ENV, PASSWORD_ENV, REMOTE_IP_ENV, REMOTE_SITE_ENV, USERNAME_ENV,
};

/// Immutable description of who is calling.
///
/// Supplied once per configuration. Blank strings are normalised to `None`
/// so that an empty form field never counts as an identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerContext {
    username: Option<String>,
    password: Option<String>,
    remote_ip: Option<String>,
    remote_site: Option<String>,
    accept_language: Option<String>,
}

impl CallerContext {
    /// Anonymous caller with no origin information.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn builder() -> CallerContextBuilder {
        CallerContextBuilder::default()
    }

    pub fn from_env() -> Self {
        CallerContext {
            username: env_optional(USERNAME_ENV),
            password: env_optional(PASSWORD_ENV),
            remote_ip: env_optional(REMOTE_IP_ENV),
            remote_site: env_optional(REMOTE_SITE_ENV),
            accept_language: env_optional(ACCEPT_LANGUAGE_ENV),
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn remote_ip(&self) -> Option<&str> {
        self.remote_ip.as_deref()
    }

    pub fn remote_site(&self) -> Option<&str> {
        self.remote_site.as_deref()
    }

    pub fn accept_language(&self) -> Option<&str> {
        self.accept_language.as_deref()
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Network origin and requesting site, when both are known.
    pub fn origin(&self) -> Option<(&str, &str)> {
        match (self.remote_ip(), self.remote_site()) {
            (Some(ip), Some(site)) => Some((ip, site)),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct CallerContextBuilder {
    inner: CallerContext,
}

impl CallerContextBuilder {
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.inner.username = non_blank(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.inner.password = non_blank(password.into());
        self
    }

    pub fn remote_ip(mut self, remote_ip: impl Into<String>) -> Self {
        self.inner.remote_ip = non_blank(remote_ip.into());
        self
    }

    pub fn remote_site(mut self, remote_site: impl Into<String>) -> Self {
        self.inner.remote_site = non_blank(remote_site.into());
        self
    }

    pub fn accept_language(mut self, accept_language: impl Into<String>) -> Self {
        self.inner.accept_language = non_blank(accept_language.into());
        self
    }

    pub fn build(self) -> CallerContext {
        self.inner
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
