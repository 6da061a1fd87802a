// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-local LRU cache, always present in front of any external store.

use std::num::NonZeroUsize;

use lru::LruCache;

/// In-process cache for usernames, running users and crypto blocks.
///
/// Unbounded while it is the only copy of the cached state. Once a host
/// store mirrors every entry, [`LocalCache::bound`] caps it at `capacity`
/// and an evicted entry is read back from the host store.
pub struct LocalCache {
    entries: LruCache<String, String>,
    capacity: NonZeroUsize,
}

impl LocalCache {
    /// Create an unbounded cache that holds at most `capacity` entries once
    /// bound.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            capacity: NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Cap the cache at its configured capacity, evicting least recently
    /// used entries beyond it.
    pub fn bound(&mut self) {
        self.entries.resize(self.capacity);
    }

    /// Stop evicting.
    pub fn unbound(&mut self) {
        self.entries.resize(NonZeroUsize::MAX);
    }

    pub fn is_bounded(&self) -> bool {
        self.entries.cap() != NonZeroUsize::MAX
    }

    pub fn get(&mut self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    pub fn put(&mut self, key: &str, value: &str) {
        self.entries.put(key.to_string(), value.to_string());
    }

    /// Every entry, most recently used first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Drop every entry whose key starts with `prefix`. Returns how many.
    pub fn remove_prefix(&mut self, prefix: &str) -> usize {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            self.entries.pop(key.as_str());
        }
        doomed.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
