//! Cache observability hooks.

use crate::error::CacheError;

/// Receives cache lifecycle events. Every method defaults to a no-op.
pub trait CacheHooks: Send + Sync {
    fn on_cache_hit(&self, _key: &str) {}

    fn on_cache_miss(&self, _key: &str) {}

    fn on_entry_persisted(&self, _key: &str, _answer_len: usize) {}

    fn on_entries_pruned(&self, _keys: &[String]) {}

    fn on_store_failure(&self, _operation: &str, _error: &CacheError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCacheHooks;

impl CacheHooks for NoopCacheHooks {}
