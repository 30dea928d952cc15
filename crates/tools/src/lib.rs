pub mod analysis;
pub mod cache;
pub mod devtools;
pub mod read_page;
pub mod registry;
pub mod research;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tabscout_core::{Config, Result};

pub use cache::ContentCache;
pub use registry::ToolRegistry;

/// Truncate a string to at most `max_chars` bytes, respecting UTF-8 char
/// boundaries.
pub fn safe_truncate(s: &str, max_chars: usize) -> &str {
    if s.len() <= max_chars {
        return s;
    }
    let mut end = max_chars;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Shared state handed to every tool invocation.
///
/// The content cache is the only state that outlives a single call; it is
/// constructed once and shared, never a module-level singleton.
#[derive(Clone)]
pub struct ToolContext {
    pub config: Config,
    pub cache: Arc<ContentCache>,
}

impl ToolContext {
    pub fn new(config: Config) -> Self {
        let ttl = std::time::Duration::from_secs(config.research.cache_ttl_secs);
        Self {
            config,
            cache: Arc::new(ContentCache::with_ttl(ttl)),
        }
    }
}

pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;
    fn validate(&self, params: &Value) -> Result<()>;
    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_truncate() {
        assert_eq!(safe_truncate("hello", 10), "hello");
        assert_eq!(safe_truncate("hello", 3), "hel");
        // Multi-byte chars are not split.
        let s = "héllo";
        let t = safe_truncate(s, 2);
        assert!(s.starts_with(t));
    }
}
