//! Answer cache: fingerprints, entry normalization, retention and persistent stores.

mod backends;
mod cache;
mod entry;
mod error;
mod history;
mod hooks;
mod key;
mod retention;
mod store;

pub mod prelude {
    pub use crate::{
        AnswerCache, AnswerStore, AnswerStoreConfig, CacheEntry, CacheError, CacheErrorKind,
        CacheHooks, CacheKey, FilesystemAnswerStore, InMemoryAnswerStore, NoopCacheHooks,
        PersistOutcome, RetentionPolicy, SqliteAnswerStore, StoreSnapshot, StoredAccessToken,
        StoredAnswer, build_cache_key, create_answer_store, create_default_answer_store,
        normalize_entry, prune_keys, renderable_entries,
    };
}

pub use backends::filesystem::FilesystemAnswerStore;
pub use cache::{AnswerCache, PersistOutcome, StoredAccessToken};
pub use entry::{CacheEntry, LEGACY_LABEL, StoredAnswer, normalize_entry};
pub use error::{CacheError, CacheErrorKind};
pub use history::{
    ACCESS_TOKEN_KEY, EXTENSION_ENABLED_KEY, HISTORY_RETENTION_KEY, PREFERENCES_KEY,
    RESERVED_KEYS, StoreSnapshot, history_keys, is_reserved_key, renderable_entries,
};
pub use hooks::{CacheHooks, NoopCacheHooks};
pub use key::{
    CACHE_KEY_PREFIX, CacheKey, ParsedCacheKey, build_cache_key, is_cache_key, parse_cache_key,
};
pub use retention::{DAY_MILLIS, RetentionPolicy, prune_keys};
pub use store::{
    AnswerStore, AnswerStoreConfig, InMemoryAnswerStore, SqliteAnswerStore, create_answer_store,
    create_default_answer_store,
};
