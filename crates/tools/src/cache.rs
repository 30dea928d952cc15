//! Per-source cache of extracted page content with time-based expiry.
//!
//! Shared across concurrent tool invocations; the mutex makes writes
//! last-write-wins per key. Expiry is logical: a stale entry is treated as
//! absent on `get` rather than eagerly deleted.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::devtools::PageContent;

/// Default time-to-live for cached content (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct CacheEntry {
    content: PageContent,
    stored_at: Instant,
}

/// Content cache keyed by source URL.
pub struct ContentCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached content for `key`, or `None` when absent or when
    /// the entry's age has reached the TTL.
    pub fn get(&self, key: &str) -> Option<PageContent> {
        let entries = self.entries.lock().expect("cache lock poisoned");
        let entry = entries.get(key)?;
        let age = entry.stored_at.elapsed();
        if age >= self.ttl {
            debug!(key, age_secs = age.as_secs(), "cache entry expired");
            return None;
        }
        Some(entry.content.clone())
    }

    /// Store content for `key`, overwriting any prior entry and stamping
    /// the current time.
    pub fn put(&self, key: &str, content: PageContent) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            key.to_string(),
            CacheEntry {
                content,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop all entries. Used for tests and explicit resets.
    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(title: &str) -> PageContent {
        PageContent {
            title: title.to_string(),
            url: "https://example.com/".to_string(),
            text: "body".to_string(),
            links: Vec::new(),
        }
    }

    #[test]
    fn test_get_after_put_returns_payload() {
        let cache = ContentCache::new();
        cache.put("https://example.com/", content("Example"));
        let hit = cache.get("https://example.com/").unwrap();
        assert_eq!(hit.title, "Example");
        assert!(cache.get("https://other.example/").is_none());
    }

    #[test]
    fn test_zero_ttl_is_always_a_miss() {
        // age >= TTL means expired, so a zero TTL expires immediately even
        // though the physical entry still exists.
        let cache = ContentCache::with_ttl(Duration::ZERO);
        cache.put("k", content("Stale"));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let cache = ContentCache::with_ttl(Duration::from_millis(30));
        cache.put("k", content("Fresh"));
        assert!(cache.get("k").is_some());
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_put_overwrites_and_restamps() {
        let cache = ContentCache::with_ttl(Duration::from_millis(50));
        cache.put("k", content("First"));
        std::thread::sleep(Duration::from_millis(30));
        cache.put("k", content("Second"));
        std::thread::sleep(Duration::from_millis(30));
        // 60ms after the first put, but only 30ms after the overwrite.
        let hit = cache.get("k").unwrap();
        assert_eq!(hit.title, "Second");
    }

    #[test]
    fn test_concurrent_puts_and_gets() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(ContentCache::new());

        // Writers race on one shared key while each thread also owns a
        // private key it reads back immediately.
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let own_key = format!("https://example.com/{}", i);
                    for round in 0..50 {
                        cache.put("shared", content(&format!("writer-{}", i)));
                        cache.put(&own_key, content(&format!("own-{}-{}", i, round)));
                        let hit = cache.get(&own_key).unwrap();
                        assert_eq!(hit.title, format!("own-{}-{}", i, round));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // The shared key holds whichever write landed last, intact.
        let shared = cache.get("shared").unwrap();
        assert!(shared.title.starts_with("writer-"));
        for i in 0..8 {
            let hit = cache.get(&format!("https://example.com/{}", i)).unwrap();
            assert_eq!(hit.title, format!("own-{}-49", i));
        }
    }

    #[test]
    fn test_clear() {
        let cache = ContentCache::new();
        cache.put("k", content("X"));
        cache.clear();
        assert!(cache.get("k").is_none());
    }
}
