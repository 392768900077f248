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

//! Contract checks shared by every backend's integration tests.
//!
//! Each check takes a namespace and only touches keys under it, so the same
//! checks run against shared Postgres/Redis instances.

#![allow(dead_code)]

use plexspaces_locks::LockBackend;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use ulid::Ulid;

/// Unique key namespace for one test.
pub fn namespace(test: &str) -> String {
    format!("{}-{}:", test, Ulid::new())
}

/// Debug-level logs for tests that exercise contention and expiry.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("plexspaces_locks=debug")
        .with_test_writer()
        .try_init();
}

fn set_of(keys: impl IntoIterator<Item = String>) -> HashSet<String> {
    keys.into_iter().collect()
}

pub async fn check_set_if_not_exists(backend: &dyn LockBackend, ns: &str) {
    let key = format!("{ns}testKeyValueKey");
    assert!(backend.set_if_not_exists(&key, "value", 60).await.unwrap());
    assert!(!backend.set_if_not_exists(&key, "value", 60).await.unwrap());
    assert!(!backend.set_if_not_exists(&key, "another val", 60).await.unwrap());
    assert_eq!(backend.get(&key).await.unwrap(), Some("value".to_string()));
}

pub async fn check_delete_if_key_has_value(backend: &dyn LockBackend, ns: &str) {
    let key = format!("{ns}testKeyValueKey");
    assert!(!backend.delete_if_key_has_value(&format!("{ns}inVaLidKeyTest"), "1").await.unwrap());

    assert!(backend.set_if_not_exists(&key, "test", 60).await.unwrap());
    assert!(!backend.delete_if_key_has_value(&key, "test2").await.unwrap());
    assert_eq!(backend.get(&key).await.unwrap(), Some("test".to_string()));

    assert!(backend.delete_if_key_has_value(&key, "test").await.unwrap());
    assert!(!backend.key_exists(&key).await.unwrap());
    assert!(!backend.delete_if_key_has_value(&key, "test").await.unwrap());

    // Deleted keys are immediately acquirable again.
    assert!(backend.set_if_not_exists(&key, "next", 60).await.unwrap());
}

pub async fn check_get_and_key_exists(backend: &dyn LockBackend, ns: &str) {
    let key = format!("{ns}testKeyValueKey");
    assert_eq!(backend.get(&key).await.unwrap(), None);
    assert!(!backend.key_exists(&key).await.unwrap());

    backend.set_if_not_exists(&key, "mytest", 60).await.unwrap();
    assert_eq!(backend.get(&key).await.unwrap(), Some("mytest".to_string()));
    assert!(backend.key_exists(&key).await.unwrap());
}

pub async fn check_keys_are_case_sensitive(backend: &dyn LockBackend, ns: &str) {
    assert!(backend.set_if_not_exists(&format!("{ns}test1"), "a", 60).await.unwrap());
    assert!(backend.set_if_not_exists(&format!("{ns}Test1"), "b", 60).await.unwrap());
    assert_eq!(backend.get(&format!("{ns}test1")).await.unwrap(), Some("a".to_string()));
    assert_eq!(backend.get(&format!("{ns}Test1")).await.unwrap(), Some("b".to_string()));
}

/// Sleeps past a one second lease.
pub async fn check_expire_frees_key(backend: &dyn LockBackend, ns: &str) {
    init_tracing();
    let key = format!("{ns}testKeyValueKey");
    assert!(backend.set_if_not_exists(&key, "test", 60).await.unwrap());
    assert!(backend.expire_if_key_has_value(&key, "test", 1).await.unwrap());

    // Still live until the new deadline
    assert!(!backend.set_if_not_exists(&key, "test", 60).await.unwrap());

    sleep(Duration::from_millis(2100)).await;

    // get and key_exists agree once expired
    assert_eq!(backend.get(&key).await.unwrap(), None);
    assert!(!backend.key_exists(&key).await.unwrap());
    assert!(!backend.expire_if_key_has_value(&key, "test", 60).await.unwrap());
    assert!(!backend.delete_if_key_has_value(&key, "test").await.unwrap());
    assert!(backend.get_keys_matching_pattern(&format!("{ns}*")).await.unwrap().is_empty());

    assert!(backend.set_if_not_exists(&key, "test2", 60).await.unwrap());
    assert_eq!(backend.get(&key).await.unwrap(), Some("test2".to_string()));
}

pub async fn check_expire_with_different_value(backend: &dyn LockBackend, ns: &str) {
    let key = format!("{ns}testKeyValueKey");
    assert!(backend.set_if_not_exists(&key, "test", 60).await.unwrap());
    assert!(!backend.expire_if_key_has_value(&key, "test2", 1).await.unwrap());
    assert!(!backend.expire_if_key_has_value(&format!("{ns}missing"), "test", 1).await.unwrap());
}

pub async fn check_expire_is_idempotent(backend: &dyn LockBackend, ns: &str) {
    let key = format!("{ns}testKeyValueKey");
    assert!(backend.set_if_not_exists(&key, "test", 60).await.unwrap());
    assert!(backend.expire_if_key_has_value(&key, "test", 60).await.unwrap());
    assert!(backend.expire_if_key_has_value(&key, "test", 60).await.unwrap());
}

pub async fn check_keys_matching_pattern(backend: &dyn LockBackend, ns: &str) {
    for (key, value) in [("abcde", "val0"), ("test1", "val1"), ("Test3", "val2"), ("Test1", "val3"), ("Test2", "val4")] {
        assert!(backend.set_if_not_exists(&format!("{ns}{key}"), value, 100).await.unwrap());
    }
    let with_ns = |keys: &[&str]| set_of(keys.iter().map(|k| format!("{ns}{k}")));

    let keys = backend.get_keys_matching_pattern(&format!("{ns}Test*")).await.unwrap();
    assert_eq!(set_of(keys), with_ns(&["Test1", "Test2", "Test3", "test1"]));

    let keys = backend.get_keys_matching_pattern(&format!("{ns}test1*")).await.unwrap();
    assert_eq!(set_of(keys), with_ns(&["Test1", "test1"]));

    let keys = backend.get_keys_matching_pattern(&format!("{ns}*est*")).await.unwrap();
    assert_eq!(set_of(keys), with_ns(&["Test1", "Test2", "Test3", "test1"]));

    assert!(backend.get_keys_matching_pattern(&format!("{ns}*fere*")).await.unwrap().is_empty());
    assert!(backend.get_keys_matching_pattern("").await.unwrap().is_empty());
}

/// `%`, `_` and `?` are literal characters in patterns.
pub async fn check_pattern_metacharacters_are_literal(backend: &dyn LockBackend, ns: &str) {
    for key in ["a_c", "abc", "a%c", "a?c"] {
        assert!(backend.set_if_not_exists(&format!("{ns}{key}"), "v", 100).await.unwrap());
    }
    for key in ["a_c", "a%c", "a?c"] {
        let keys = backend.get_keys_matching_pattern(&format!("{ns}{key}")).await.unwrap();
        assert_eq!(keys, vec![format!("{ns}{key}")], "pattern {key}");
    }
}

pub async fn check_concurrent_set_if_not_exists(backends: Vec<Arc<dyn LockBackend>>, ns: &str) {
    init_tracing();
    let key = format!("{ns}concurrent-lock");
    let mut handles = vec![];

    for i in 0..20 {
        let backend = backends[i % backends.len()].clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            backend.set_if_not_exists(&key, &format!("node-{}", i), 30).await
        }));
    }

    let mut acquired = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            acquired += 1;
        }
    }
    assert_eq!(acquired, 1);
}
