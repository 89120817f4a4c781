//! Shared key-value cache, the pipeline's only persistence layer.
//!
//! Rails-style implicit caching is replaced by an explicit `CacheStore` trait
//! injected into every component that holds shared state (auth session, rate
//! window, per-country pages, descriptors, final report). The trait is
//! deliberately string-valued and object-safe; the `Cache` wrapper layers
//! typed JSON access on top.

mod memory;

pub use memory::MemoryCache;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Minimal contract for a shared, TTL-aware key-value store.
///
/// Implementations must be fail-open friendly: an unreachable backend should
/// surface as `None` from `read` and a no-op from `write`, never a panic.
pub trait CacheStore: Send + Sync {
    /// Returns the value for `key` if present and not expired.
    fn read(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, expiring after `ttl`.
    fn write(&self, key: &str, value: String, ttl: Duration);

    /// Removes `key` if present.
    fn delete(&self, key: &str);
}

/// Cloneable handle adding typed JSON access over a `CacheStore`.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Reads and deserializes `key`. A missing entry or an undecodable value
    /// both come back as `None`; a stale encoding is dropped so it cannot
    /// wedge the pipeline.
    pub fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.read(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding undecodable cache entry {}: {}", key, e);
                self.store.delete(key);
                None
            },
        }
    }

    /// Serializes and stores `value` under `key`. Serialization failures are
    /// logged and swallowed; the cache is best-effort by contract.
    pub fn write_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(raw) => self.store.write(key, raw, ttl),
            Err(e) => warn!("Failed to encode cache entry {}: {}", key, e),
        }
    }

    pub fn delete(&self, key: &str) {
        self.store.delete(key);
    }
}
