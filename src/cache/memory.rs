//! In-memory `CacheStore` implementation.
//!
//! Serves single-process deployments and doubles as the test fake. Entries
//! carry an absolute deadline; expired entries are dropped lazily on read.
//! Safe to share via `Arc<MemoryCache>` across async tasks.

use super::CacheStore;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

struct Entry {
    value: String,
    deadline: Instant,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCache {
    fn read(&self, key: &str) -> Option<String> {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(_) => return None, // fail open on a poisoned lock
        };
        match entries.get(key) {
            Some(entry) if entry.deadline > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            },
            None => None,
        }
    }

    fn write(&self, key: &str, value: String, ttl: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key.to_string(),
                Entry {
                    value,
                    deadline: Instant::now() + ttl,
                },
            );
        }
    }

    fn delete(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_written_value() {
        let cache = MemoryCache::new();
        cache.write("k", "v".to_string(), Duration::from_secs(60));
        assert_eq!(cache.read("k"), Some("v".to_string()));
    }

    #[test]
    fn read_misses_after_expiry() {
        let cache = MemoryCache::new();
        cache.write("k", "v".to_string(), Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.read("k"), None);
    }

    #[test]
    fn delete_removes_entry() {
        let cache = MemoryCache::new();
        cache.write("k", "v".to_string(), Duration::from_secs(60));
        cache.delete("k");
        assert_eq!(cache.read("k"), None);
    }
}
