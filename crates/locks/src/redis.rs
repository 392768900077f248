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

//! Redis-based lock backend.
//!
//! ## Features
//! - **Native TTL**: `SET key value NX PX ttl` creates an entry only when no
//!   live key exists, and Redis itself drops it at the deadline
//! - **Compare-and-set**: release and renew run as Lua scripts, so the value
//!   check and the `DEL` / `PEXPIRE` are one atomic step on the server
//! - **Pattern scans**: cursor-based `SCAN MATCH`, never `KEYS`
//!
//! Redis clocks the deadlines, so callers never compare their own clocks.

use crate::pattern::{escape_redis_literal, GlobPattern};
use crate::{ttl_millis, LockBackend, LockResult};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client, Script};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

const DELETE_IF_VALUE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

const EXPIRE_IF_VALUE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('PEXPIRE', KEYS[1], ARGV[2])
end
return 0
"#;

const SCAN_COUNT: usize = 500;

/// Redis-based lock backend.
///
/// ## Architecture
/// - `ConnectionManager` for a multiplexed connection with reconnects
/// - Optional key prefix so several applications can share one Redis
#[derive(Clone)]
pub struct RedisLockBackend {
    manager: ConnectionManager,
    prefix: String,
    delete_script: Script,
    expire_script: Script,
}

impl RedisLockBackend {
    /// Create a new Redis lock backend with the given URL and key prefix.
    ///
    /// Example URLs:
    /// - `redis://127.0.0.1/`
    /// - `rediss://host:6379/`
    #[instrument(skip(redis_url))]
    pub async fn new(redis_url: &str, prefix: &str) -> LockResult<Self> {
        let client = Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;

        info!("Redis lock backend ready");
        Ok(Self {
            manager,
            prefix: prefix.to_string(),
            delete_script: Script::new(DELETE_IF_VALUE_SCRIPT),
            expire_script: Script::new(EXPIRE_IF_VALUE_SCRIPT),
        })
    }

    fn prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// `PX 0` is rejected by Redis; a zero lease becomes the shortest one.
    fn ttl_px(ttl_secs: u64) -> i64 {
        ttl_millis(ttl_secs).max(1)
    }
}

#[async_trait]
impl LockBackend for RedisLockBackend {
    #[instrument(skip(self, value), fields(backend = "redis"))]
    async fn set_if_not_exists(&self, key: &str, value: &str, ttl_secs: u64) -> LockResult<bool> {
        let mut conn = self.manager.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.prefixed_key(key))
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(Self::ttl_px(ttl_secs))
            .query_async(&mut conn)
            .await?;

        let acquired = reply.is_some();
        if !acquired {
            debug!("lock entry is live, not acquired");
        }
        Ok(acquired)
    }

    #[instrument(skip(self, value), fields(backend = "redis"))]
    async fn delete_if_key_has_value(&self, key: &str, value: &str) -> LockResult<bool> {
        let mut conn = self.manager.clone();
        let deleted: i64 = self
            .delete_script
            .key(self.prefixed_key(key))
            .arg(value)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted == 1)
    }

    #[instrument(skip(self, value), fields(backend = "redis"))]
    async fn expire_if_key_has_value(&self, key: &str, value: &str, ttl_secs: u64) -> LockResult<bool> {
        let mut conn = self.manager.clone();
        let updated: i64 = self
            .expire_script
            .key(self.prefixed_key(key))
            .arg(value)
            .arg(Self::ttl_px(ttl_secs))
            .invoke_async(&mut conn)
            .await?;
        Ok(updated == 1)
    }

    async fn get(&self, key: &str) -> LockResult<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(self.prefixed_key(key))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn key_exists(&self, key: &str) -> LockResult<bool> {
        let mut conn = self.manager.clone();
        let count: i64 = redis::cmd("EXISTS")
            .arg(self.prefixed_key(key))
            .query_async(&mut conn)
            .await?;
        Ok(count > 0)
    }

    #[instrument(skip(self), fields(backend = "redis"))]
    async fn get_keys_matching_pattern(&self, pattern: &str) -> LockResult<Vec<String>> {
        let glob = match GlobPattern::parse(pattern) {
            Ok(glob) => glob,
            Err(e) => {
                debug!(error = %e, "no keys for invalid pattern");
                return Ok(Vec::new());
            }
        };

        let mut conn = self.manager.clone();
        let match_pattern = format!("{}{}", escape_redis_literal(&self.prefix), glob.to_redis_match());

        // SCAN may return a key more than once across iterations.
        let mut keys = HashSet::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&match_pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;

            keys.extend(
                batch
                    .into_iter()
                    .filter_map(|k| k.strip_prefix(self.prefix.as_str()).map(str::to_string)),
            );

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(keys.into_iter().collect())
    }

    async fn purge_expired(&self) -> LockResult<u64> {
        // Redis evicts expired keys itself.
        Ok(0)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
