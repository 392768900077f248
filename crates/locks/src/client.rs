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

//! Caller-facing lock client.
//!
//! ## Purpose
//! Wraps a [`LockBackend`] with the token discipline every caller needs:
//! each acquisition gets a fresh ULID as its value, and renew/release only
//! ever present that token, so a holder whose lease already lapsed can never
//! renew or release the next holder's lock.
//!
//! ## Design
//! - **Acquire**: one `set_if_not_exists` attempt, or a retry loop with
//!   exponential backoff bounded by a total timeout
//! - **Renew**: `expire_if_key_has_value` with the held token; long-running
//!   holders should call [`DistributedLock::reexpire_lock`] well before the
//!   lease runs out
//! - **Release**: `delete_if_key_has_value` with the held token
//! - **Errors**: contention is `false`; only a store failure aborts a retry loop

use crate::{LockBackend, LockError, LockResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};
use ulid::Ulid;

/// Backoff policy for [`DistributedLock::acquire_lock_with_retry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay after the first failed attempt
    pub initial_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Growth factor applied to the delay after each failed attempt
    pub multiplier: u32,
    /// Total time budget for all attempts
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            multiplier: 2,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
struct HeldLock {
    key: String,
    token: String,
    ttl_secs: u64,
}

/// A named lock acquired through a shared [`LockBackend`].
///
/// One `DistributedLock` holds at most one lock at a time. All keys are
/// built as `prefix + id`, which also scopes
/// [`all_acquired_lock_keys`](Self::all_acquired_lock_keys).
///
/// ## Example
/// ```rust,ignore
/// let mut lock = DistributedLock::new(backend, "archive.");
///
/// let archived = lock.execute("site-1", 60, || async {
///     archive_site(1).await
/// }).await?;
/// ```
pub struct DistributedLock {
    backend: Arc<dyn LockBackend>,
    lock_key_prefix: String,
    held: Option<HeldLock>,
}

impl DistributedLock {
    /// Create a client whose keys all start with `lock_key_prefix`.
    pub fn new(backend: Arc<dyn LockBackend>, lock_key_prefix: impl Into<String>) -> Self {
        Self {
            backend,
            lock_key_prefix: lock_key_prefix.into(),
            held: None,
        }
    }

    /// Full key of the currently held lock, if any.
    pub fn held_key(&self) -> Option<&str> {
        self.held.as_ref().map(|held| held.key.as_str())
    }

    fn lock_key(&self, id: &str) -> LockResult<String> {
        if id.is_empty() {
            return Err(LockError::InvalidKey("lock id must not be empty".to_string()));
        }
        Ok(format!("{}{}", self.lock_key_prefix, id))
    }

    /// Single acquisition attempt.
    ///
    /// A lock already held by this client is released first.
    ///
    /// ## Returns
    /// - `Ok(true)`: lock acquired with a fresh token
    /// - `Ok(false)`: lock is held elsewhere
    #[instrument(skip(self), fields(backend = self.backend.backend_name()))]
    pub async fn acquire_lock(&mut self, id: &str, ttl_secs: u64) -> LockResult<bool> {
        let key = self.lock_key(id)?;
        if self.held.is_some() {
            self.unlock().await?;
        }

        let token = Ulid::new().to_string();
        let acquired = self.backend.set_if_not_exists(&key, &token, ttl_secs).await?;
        if acquired {
            self.held = Some(HeldLock { key, token, ttl_secs });
        }
        Ok(acquired)
    }

    /// Acquire, retrying with exponential backoff until `policy.timeout`.
    ///
    /// ## Returns
    /// - `Ok(())`: lock acquired
    /// - `Err(LockError::AcquireTimeout)`: still contended when the budget ran out
    /// - `Err(LockError::StorageUnavailable)`: store failure, not retried
    #[instrument(skip(self, policy), fields(backend = self.backend.backend_name()))]
    pub async fn acquire_lock_with_retry(&mut self, id: &str, ttl_secs: u64, policy: &RetryPolicy) -> LockResult<()> {
        let started = Instant::now();
        let mut delay = policy.initial_delay;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            if self.acquire_lock(id, ttl_secs).await? {
                debug!(attempts, "lock acquired");
                return Ok(());
            }

            let elapsed = started.elapsed();
            if elapsed >= policy.timeout {
                warn!(attempts, waited_ms = elapsed.as_millis() as u64, "gave up acquiring lock");
                return Err(LockError::AcquireTimeout {
                    key: self.lock_key(id)?,
                    waited_ms: elapsed.as_millis() as u64,
                });
            }

            tokio::time::sleep(delay.min(policy.timeout - elapsed)).await;
            delay = delay.saturating_mul(policy.multiplier.max(1)).min(policy.max_delay);
        }
    }

    /// Run `f` while holding the lock `id`, releasing it afterwards.
    ///
    /// Makes a single acquisition attempt; contention surfaces as
    /// [`LockError::LockHeld`] and `f` is not run.
    pub async fn execute<F, Fut, T>(&mut self, id: &str, ttl_secs: u64, f: F) -> LockResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if !self.acquire_lock(id, ttl_secs).await? {
            return Err(LockError::LockHeld(self.lock_key(id)?));
        }

        let output = f().await;
        self.unlock().await?;
        Ok(output)
    }

    /// True iff the store still holds this client's token for its key.
    pub async fn is_locked(&self) -> LockResult<bool> {
        match &self.held {
            Some(held) => Ok(self.backend.get(&held.key).await?.as_deref() == Some(held.token.as_str())),
            None => Ok(false),
        }
    }

    /// Move the held lock's deadline to `ttl_secs` from now.
    ///
    /// Returns `false` when nothing is held, `ttl_secs` is zero, or the lease
    /// already lapsed.
    pub async fn expire_lock(&self, ttl_secs: u64) -> LockResult<bool> {
        match &self.held {
            Some(held) if ttl_secs > 0 => {
                let renewed = self
                    .backend
                    .expire_if_key_has_value(&held.key, &held.token, ttl_secs)
                    .await?;
                if !renewed {
                    warn!(key = %held.key, "lease lapsed before renewal");
                }
                Ok(renewed)
            }
            _ => Ok(false),
        }
    }

    /// Renew with the ttl used when the lock was acquired.
    pub async fn reexpire_lock(&self) -> LockResult<bool> {
        match &self.held {
            Some(held) => self.expire_lock(held.ttl_secs).await,
            None => Ok(false),
        }
    }

    /// Release the held lock, if any.
    ///
    /// The token is forgotten even when the store no longer had it.
    pub async fn unlock(&mut self) -> LockResult<()> {
        if let Some(held) = self.held.take() {
            let deleted = self.backend.delete_if_key_has_value(&held.key, &held.token).await?;
            if !deleted {
                debug!(key = %held.key, "lock was no longer held at release");
            }
        }
        Ok(())
    }

    /// Live keys under this client's prefix, held by anyone.
    pub async fn all_acquired_lock_keys(&self) -> LockResult<Vec<String>> {
        let pattern = format!("{}*", self.lock_key_prefix);
        self.backend.get_keys_matching_pattern(&pattern).await
    }

    /// Number of live keys under this client's prefix.
    pub async fn number_of_acquired_locks(&self) -> LockResult<usize> {
        Ok(self.all_acquired_lock_keys().await?.len())
    }
}
