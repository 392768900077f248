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

//! Error types for distributed lock operations.
//!
//! Only infrastructure failures are errors at the backend layer. Losing a
//! race for a key, deleting a key that is not ours, or reading a key that
//! does not exist are all expressed as `false` / `None`.

use thiserror::Error;

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Errors that can occur during lock operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// The shared store could not be reached or rejected the statement.
    ///
    /// Callers retrying an acquisition should back off differently on this
    /// error than on a plain `false` (contention).
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Malformed glob pattern
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Invalid lock key or lock id
    #[error("Invalid lock key: {0}")]
    InvalidKey(String),

    /// Lock is held by another holder (client layer only)
    #[error("Lock already held: {0}")]
    LockHeld(String),

    /// Retry budget exhausted while acquiring (client layer only)
    #[error("Timed out acquiring lock {key} after {waited_ms}ms")]
    AcquireTimeout { key: String, waited_ms: u64 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LockError {
    /// True for failures of the shared store itself.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, LockError::StorageUnavailable(_))
    }
}

#[cfg(any(feature = "sqlite-backend", feature = "postgres-backend"))]
impl From<sqlx::Error> for LockError {
    fn from(err: sqlx::Error) -> Self {
        LockError::StorageUnavailable(format!("SQL error: {}", err))
    }
}

#[cfg(feature = "redis-backend")]
impl From<redis::RedisError> for LockError {
    fn from(err: redis::RedisError) -> Self {
        LockError::StorageUnavailable(format!("Redis error: {}", err))
    }
}
