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

//! Lock backend trait for lease-based mutual exclusion over a shared store.

use crate::LockResult;
use async_trait::async_trait;

/// Trait for storage-backed lock coordination.
///
/// ## Purpose
/// Exposes single-key compare-and-set primitives with TTL. Every method maps
/// to one atomic statement (or command) of the underlying store, so it is
/// safe to call from any number of processes against the same key without
/// further synchronization.
///
/// ## Liveness
/// An entry is *live* iff it exists and its deadline is after the store's
/// current time. Expired entries behave exactly like absent ones for every
/// operation, whether or not they have been physically removed yet.
///
/// ## Usage Pattern
/// A caller generates a unique token per acquisition attempt, passes it as
/// `value` to [`set_if_not_exists`](Self::set_if_not_exists), and later
/// renews or releases with that same token. [`DistributedLock`](crate::DistributedLock)
/// packages this pattern.
///
/// ## Example
/// ```rust,ignore
/// use plexspaces_locks::{LockBackend, memory::MemoryLockBackend};
///
/// let backend = MemoryLockBackend::new();
///
/// assert!(backend.set_if_not_exists("archive:site-1", "token-a", 60).await?);
/// assert!(!backend.set_if_not_exists("archive:site-1", "token-b", 60).await?);
///
/// // Heartbeat
/// assert!(backend.expire_if_key_has_value("archive:site-1", "token-a", 60).await?);
///
/// // Release
/// assert!(backend.delete_if_key_has_value("archive:site-1", "token-a").await?);
/// ```
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Insert `(key, value)` with a deadline `ttl_secs` from now, unless a
    /// live entry already exists.
    ///
    /// ## Returns
    /// - `Ok(true)`: entry created (or an expired entry overwritten)
    /// - `Ok(false)`: a live entry exists, whatever its value
    /// - `Err(LockError::StorageUnavailable)`: store failure
    async fn set_if_not_exists(&self, key: &str, value: &str, ttl_secs: u64) -> LockResult<bool>;

    /// Delete the entry for `key` only if it is live and holds `value`.
    ///
    /// ## Returns
    /// - `Ok(true)`: the entry was deleted
    /// - `Ok(false)`: absent, expired, or held by another value
    async fn delete_if_key_has_value(&self, key: &str, value: &str) -> LockResult<bool>;

    /// Move the deadline of a live entry holding `value` to `ttl_secs` from now.
    ///
    /// Renewing twice with the same ttl returns `true` both times.
    ///
    /// ## Returns
    /// - `Ok(true)`: deadline updated
    /// - `Ok(false)`: absent, expired, or held by another value
    async fn expire_if_key_has_value(&self, key: &str, value: &str, ttl_secs: u64) -> LockResult<bool>;

    /// Live value for `key`, or `None`. Does not touch the deadline.
    async fn get(&self, key: &str) -> LockResult<Option<String>>;

    /// True iff a live entry exists for `key`.
    async fn key_exists(&self, key: &str) -> LockResult<bool>;

    /// All live keys matching a `*` glob, compared case-insensitively.
    ///
    /// Order is unspecified. A malformed pattern yields an empty list.
    async fn get_keys_matching_pattern(&self, pattern: &str) -> LockResult<Vec<String>>;

    /// Physically remove expired entries, returning how many were removed.
    ///
    /// Never touches live entries. Backends whose store expires keys
    /// natively return `Ok(0)`.
    async fn purge_expired(&self) -> LockResult<u64>;

    /// Short backend identifier for logs.
    fn backend_name(&self) -> &'static str;
}
