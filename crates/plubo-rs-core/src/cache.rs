//! The host key-value store contract used by stateful middleware.
//!
//! Rate-limit counters and cached responses live behind [`KeyValueStore`], a
//! host-provided store with per-entry TTL. Middleware units do not add their
//! own concurrency control on top of it: concurrent increments of the same
//! counter are last-writer-wins.
//!
//! [`InMemoryStore`] is the reference implementation. It measures expiry with
//! [`tokio::time::Instant`], so tests can pause and advance time.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use plubo_rs_core::cache::{CacheValue, InMemoryStore, KeyValueStore};
//! use std::time::Duration;
//!
//! async fn example() {
//!     let store = InMemoryStore::new();
//!     store.set("key", CacheValue::String("hello".to_string()), Some(Duration::from_secs(60))).await.unwrap();
//!     let hits = store.incr("hits", 1, Duration::from_secs(60)).await.unwrap();
//!     assert_eq!(hits, 1);
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::PluboError;

/// A value that can be stored in a [`KeyValueStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CacheValue {
    /// A string value.
    String(String),
    /// A 64-bit integer value (counters).
    Integer(i64),
    /// A JSON value (serialized responses).
    Json(serde_json::Value),
}

impl CacheValue {
    /// Returns the value as a string, if it is a `String` variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an i64, if it is an `Integer` variant.
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as JSON, if it is a `Json` variant.
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }
}

/// A host key-value store with per-entry expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieves a value, or `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> Result<Option<CacheValue>, PluboError>;

    /// Stores a value. `None` means the entry never expires.
    async fn set(
        &self,
        key: &str,
        value: CacheValue,
        ttl: Option<Duration>,
    ) -> Result<(), PluboError>;

    /// Increments an integer counter by `delta` and returns the new value.
    ///
    /// A missing or expired counter starts from zero and expires after `ttl`;
    /// an existing counter keeps its original expiry.
    async fn incr(&self, key: &str, delta: i64, ttl: Duration) -> Result<i64, PluboError>;

    /// Deletes a value. Returns `true` if a live entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, PluboError>;
}

#[derive(Debug, Clone)]
struct StoreEntry {
    value: CacheValue,
    expires_at: Option<Instant>,
}

impl StoreEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }
}

/// A thread-safe in-memory [`KeyValueStore`].
///
/// Clones share the same underlying map. Expired entries are dropped lazily
/// on write.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<RwLock<HashMap<String, StoreEntry>>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live entries.
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|e| !e.is_expired()).count()
    }

    /// Returns `true` if the store holds no live entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>, PluboError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| !e.is_expired())
            .map(|e| e.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: CacheValue,
        ttl: Option<Duration>,
    ) -> Result<(), PluboError> {
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| !e.is_expired());
        let expires_at = ttl.map(|d| Instant::now() + d);
        entries.insert(key.to_string(), StoreEntry { value, expires_at });
        Ok(())
    }

    async fn incr(&self, key: &str, delta: i64, ttl: Duration) -> Result<i64, PluboError> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(key).filter(|e| !e.is_expired()) {
            return match &entry.value {
                CacheValue::Integer(current) => {
                    let next = current.saturating_add(delta);
                    entry.value = CacheValue::Integer(next);
                    Ok(next)
                }
                _ => Err(PluboError::StoreError(format!(
                    "Store key '{key}' is not an integer"
                ))),
            };
        }
        entries.insert(
            key.to_string(),
            StoreEntry {
                value: CacheValue::Integer(delta),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(delta)
    }

    async fn delete(&self, key: &str) -> Result<bool, PluboError> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(key).is_some_and(|e| !e.is_expired()))
    }
}
