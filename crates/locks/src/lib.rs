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

//! # PlexSpaces Distributed Locks
//!
//! ## Purpose
//! Lets independent processes, possibly on different hosts, take turns on a
//! named resource by using a shared store as the arbiter. Each lock is a
//! lease: it carries a deadline, so a holder that crashes stops blocking
//! everyone else once the deadline passes.
//!
//! ## Architecture Context
//! ```text
//! DistributedLock (acquire / retry / renew / release)
//!        │
//! LockBackend (set-if-absent, delete-if-value, expire-if-value, get, exists, scan)
//!        │
//! Storage adapter (memory │ SQLite │ PostgreSQL │ Redis)
//!        │
//! Shared store (single source of truth)
//! ```
//!
//! ## Design Decisions
//! - **One atomic statement per operation**: conditional upserts and
//!   conditional deletes/updates, never read-then-write
//! - **Store clock**: deadlines are computed and compared with the store's
//!   own clock so callers with skewed clocks still agree
//! - **Lazy expiry**: expired rows are ignored by every read and overwritten
//!   by the next insert; [`sweeper::ReclamationSweeper`] can purge them eagerly
//! - **Booleans for contention**: only store failures are errors
//!
//! ## Backend Support
//!
//! - **InMemory**: HashMap-based (feature: `memory-backend`, default)
//! - **SQLite**: Persistent, single-host (feature: `sqlite-backend`)
//! - **PostgreSQL**: Distributed, multi-node (feature: `postgres-backend`)
//! - **Redis**: Distributed with native TTL (feature: `redis-backend`)
//!
//! ## Examples
//!
//! ### Basic Usage
//! ```rust,no_run
//! use plexspaces_locks::{LockBackend, memory::MemoryLockBackend};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = MemoryLockBackend::new();
//!
//! if backend.set_if_not_exists("archive:site-1", "token-a", 30).await? {
//!     // ... work, renewing before 30s elapse ...
//!     backend.expire_if_key_has_value("archive:site-1", "token-a", 30).await?;
//!     backend.delete_if_key_has_value("archive:site-1", "token-a").await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Lock Client
//! ```rust,no_run
//! use plexspaces_locks::{DistributedLock, RetryPolicy, memory::MemoryLockBackend};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut lock = DistributedLock::new(Arc::new(MemoryLockBackend::new()), "archive:");
//! lock.acquire_lock_with_retry("site-1", 30, &RetryPolicy::default()).await?;
//! // ... critical section ...
//! lock.unlock().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod pattern;
pub mod sweeper;

#[cfg(feature = "memory-backend")]
pub mod memory;

#[cfg(any(feature = "sqlite-backend", feature = "postgres-backend"))]
pub mod sql;

#[cfg(feature = "redis-backend")]
pub mod redis;

pub use backend::LockBackend;
pub use client::{DistributedLock, RetryPolicy};
pub use config::{create_lock_backend_from_config, create_lock_backend_from_env, BackendType, LockBackendConfig};
pub use error::{LockError, LockResult};
pub use pattern::GlobPattern;
pub use sweeper::ReclamationSweeper;

/// Upper bound on a lease, roughly a century. Keeps deadline arithmetic
/// inside 64-bit millisecond timestamps on every backend.
pub const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Lease length in milliseconds, clamped to [`MAX_TTL_SECS`].
pub(crate) fn ttl_millis(ttl_secs: u64) -> i64 {
    (ttl_secs.min(MAX_TTL_SECS) * 1000) as i64
}
