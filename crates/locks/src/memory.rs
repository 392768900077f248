// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of PlexSpaces.
//
// PlexSpaces is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// PlexSpaces is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with PlexSpaces. If not, see <https://www.gnu.org/licenses/>.

//! In-memory lock backend implementation (for testing).

use crate::pattern::GlobPattern;
use crate::{ttl_millis, LockBackend, LockResult};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// A stored lock entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockEntry {
    /// Lock key (case-sensitive)
    pub key: String,
    /// Holder token
    pub value: String,
    /// Deadline after which the entry counts as absent
    pub expires_at: DateTime<Utc>,
}

impl LockEntry {
    fn new(key: &str, value: &str, now: DateTime<Utc>, ttl_secs: u64) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            expires_at: deadline(now, ttl_secs),
        }
    }

    /// True while the deadline is after `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

fn deadline(now: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
    TimeDelta::try_milliseconds(ttl_millis(ttl_secs))
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// In-memory lock backend (for testing).
///
/// ## Purpose
/// Provides a `LockBackend` for tests and single-process scenarios. Every
/// conditional operation runs under one write guard, which gives the same
/// per-key atomicity a real store provides across processes.
///
/// ## Limitations
/// - Not persistent (entries lost on restart)
/// - Not distributed (single process only)
/// - Expired entries stay in the map until overwritten or purged
#[derive(Clone, Default)]
pub struct MemoryLockBackend {
    entries: Arc<RwLock<HashMap<String, LockEntry>>>,
}

impl MemoryLockBackend {
    /// Create a new in-memory lock backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of physically stored entries, live or expired.
    pub async fn stored_entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl LockBackend for MemoryLockBackend {
    #[instrument(skip(self, value), fields(backend = "memory"))]
    async fn set_if_not_exists(&self, key: &str, value: &str, ttl_secs: u64) -> LockResult<bool> {
        let mut entries = self.entries.write().await;
        let now = Utc::now();

        if let Some(existing) = entries.get(key) {
            if existing.is_live(now) {
                debug!("lock entry is live, not acquired");
                return Ok(false);
            }
        }

        entries.insert(key.to_string(), LockEntry::new(key, value, now, ttl_secs));
        Ok(true)
    }

    #[instrument(skip(self, value), fields(backend = "memory"))]
    async fn delete_if_key_has_value(&self, key: &str, value: &str) -> LockResult<bool> {
        let mut entries = self.entries.write().await;
        let now = Utc::now();

        match entries.get(key) {
            Some(existing) if existing.is_live(now) && existing.value == value => {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    #[instrument(skip(self, value), fields(backend = "memory"))]
    async fn expire_if_key_has_value(&self, key: &str, value: &str, ttl_secs: u64) -> LockResult<bool> {
        let mut entries = self.entries.write().await;
        let now = Utc::now();

        match entries.get_mut(key) {
            Some(existing) if existing.is_live(now) && existing.value == value => {
                existing.expires_at = deadline(now, ttl_secs);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get(&self, key: &str) -> LockResult<Option<String>> {
        let entries = self.entries.read().await;
        let now = Utc::now();
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn key_exists(&self, key: &str) -> LockResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn get_keys_matching_pattern(&self, pattern: &str) -> LockResult<Vec<String>> {
        let glob = match GlobPattern::parse(pattern) {
            Ok(glob) => glob,
            Err(e) => {
                debug!(error = %e, "no keys for invalid pattern");
                return Ok(Vec::new());
            }
        };

        let entries = self.entries.read().await;
        let now = Utc::now();
        Ok(entries
            .values()
            .filter(|entry| entry.is_live(now) && glob.matches(&entry.key))
            .map(|entry| entry.key.clone())
            .collect())
    }

    async fn purge_expired(&self) -> LockResult<u64> {
        let mut entries = self.entries.write().await;
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        Ok((before - entries.len()) as u64)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
