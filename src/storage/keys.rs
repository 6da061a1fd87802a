// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cache key layout.
//!
//! ```text
//! USERNAME:{remote_ip}:{remote_site}
//! RUNNING_USER:{username}
//! CRYPTO_BLOCK:{username}:{method}
//! CRYPTO_BLOCK:{username}:{method}:{object_key}
//! ```
//!
//! Every field is form-urlencoded, so a `:` inside a username or object key
//! is escaped and two different field tuples can never produce the same key.

pub const USERNAME_PREFIX: &str = "USERNAME";
pub const RUNNING_USER_PREFIX: &str = "RUNNING_USER";
pub const CRYPTO_PREFIX: &str = "CRYPTO_BLOCK";

const SEPARATOR: char = ':';

fn encode(field: &str) -> String {
    url::form_urlencoded::byte_serialize(field.as_bytes()).collect()
}

fn join(prefix: &str, fields: &[&str]) -> String {
    let mut key = String::from(prefix);
    for field in fields {
        key.push(SEPARATOR);
        key.push_str(&encode(field));
    }
    key
}

/// Prefix matching every crypto-block entry, for bulk invalidation.
pub fn crypto_namespace() -> String {
    format!("{CRYPTO_PREFIX}{SEPARATOR}")
}

pub fn username_key(remote_ip: &str, remote_site: &str) -> String {
    join(USERNAME_PREFIX, &[remote_ip, remote_site])
}

pub fn running_user_key(username: &str) -> String {
    join(RUNNING_USER_PREFIX, &[username])
}

pub fn crypto_key(username: &str, method_name: &str) -> String {
    join(CRYPTO_PREFIX, &[username, method_name])
}

pub fn crypto_object_key(username: &str, method_name: &str, object_key: &str) -> String {
    join(CRYPTO_PREFIX, &[username, method_name, object_key])
}
