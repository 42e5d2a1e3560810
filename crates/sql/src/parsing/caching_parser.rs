//! Caching parser for SQL statements
//!
//! A connection re-executes the same text often (prepared statements,
//! re-bound parameters). This keeps an LRU cache of parsed statements so the
//! text is only tokenized once.

use super::{Parser, Statement};
use crate::error::Result;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default capacity for the parse cache
const DEFAULT_CACHE_CAPACITY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(255);

/// A caching wrapper around the SQL parser
pub struct CachingParser {
    cache: LruCache<String, Arc<Vec<Statement>>>,
}

impl CachingParser {
    /// Create a new caching parser with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a new caching parser with specified capacity
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            cache: LruCache::new(capacity),
        }
    }

    /// Parses `;`-separated statements, consulting the cache first. Failed
    /// parses are not cached.
    pub fn parse_script(&mut self, sql: &str) -> Result<Arc<Vec<Statement>>> {
        let key = sql.trim();
        if let Some(statements) = self.cache.get(key) {
            tracing::trace!(sql = key, "parse cache hit");
            return Ok(statements.clone());
        }
        let statements = Arc::new(Parser::parse_script(key)?);
        self.cache.put(key.to_string(), statements.clone());
        Ok(statements)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Clear the cache
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl Default for CachingParser {
    fn default() -> Self {
        Self::new()
    }
}
