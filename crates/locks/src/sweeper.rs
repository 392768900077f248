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

//! Background reclamation of expired lock entries.
//!
//! Expiry is already enforced by every read and write, so this task only
//! bounds how many dead rows accumulate in stores without native expiry.
//! Running it or not makes no observable difference to lock semantics.

use crate::LockBackend;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Periodic `purge_expired` task.
pub struct ReclamationSweeper {
    shutdown: Arc<Notify>,
    purged_total: Arc<AtomicU64>,
    handle: JoinHandle<()>,
}

impl ReclamationSweeper {
    /// Spawn the sweeper on the current tokio runtime.
    pub fn start(backend: Arc<dyn LockBackend>, every: Duration) -> Self {
        let shutdown = Arc::new(Notify::new());
        let purged_total = Arc::new(AtomicU64::new(0));

        let task_shutdown = shutdown.clone();
        let task_total = purged_total.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval(every.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(backend = backend.backend_name(), every_ms = every.as_millis() as u64, "lock sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match backend.purge_expired().await {
                            Ok(0) => {}
                            Ok(purged) => {
                                task_total.fetch_add(purged, Ordering::Relaxed);
                                debug!(purged, "purged expired lock entries");
                            }
                            Err(e) => warn!(error = %e, "lock sweep failed"),
                        }
                    }
                    _ = task_shutdown.notified() => {
                        break;
                    }
                }
            }

            info!("lock sweeper stopped");
        });

        Self {
            shutdown,
            purged_total,
            handle,
        }
    }

    /// Entries removed since the sweeper started.
    pub fn purged_total(&self) -> u64 {
        self.purged_total.load(Ordering::Relaxed)
    }

    /// Stop the task and wait for it to finish.
    pub async fn shutdown(self) -> u64 {
        // notify_one stores a permit if the task is mid-purge.
        self.shutdown.notify_one();
        let _ = self.handle.await;
        self.purged_total.load(Ordering::Relaxed)
    }
}
