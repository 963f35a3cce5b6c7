//! Answer cache facade: lookup, persist-then-prune and history management.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use gcache::{AnswerCache, InMemoryAnswerStore, RetentionPolicy};
//! use gcommon::FixedClock;
//!
//! let cache = AnswerCache::new(Arc::new(InMemoryAnswerStore::new()))
//!     .with_clock(Arc::new(FixedClock::new(1_000)))
//!     .with_retention(RetentionPolicy::new(30, 200));
//! let _store = cache.store();
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use gcommon::{BoxFuture, Clock, Preferences, SystemClock};
use gstream::{CredentialSource, StreamError, TransportAuth};
use serde_json::Value;

use crate::entry::{CacheEntry, StoredAnswer, normalize_entry};
use crate::error::CacheError;
use crate::history::{
    ACCESS_TOKEN_KEY, HISTORY_RETENTION_KEY, StoreSnapshot, is_reserved_key, renderable_entries,
};
use crate::hooks::{CacheHooks, NoopCacheHooks};
use crate::key::{CacheKey, build_cache_key};
use crate::retention::{RetentionPolicy, prune_keys};
use crate::store::AnswerStore;

/// Result of writing one finalized answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOutcome {
    pub key: CacheKey,
    pub pruned: BTreeSet<String>,
}

pub struct AnswerCache {
    store: Arc<dyn AnswerStore>,
    hooks: Arc<dyn CacheHooks>,
    clock: Arc<dyn Clock>,
    retention: Option<RetentionPolicy>,
}

impl AnswerCache {
    pub fn new(store: Arc<dyn AnswerStore>) -> Self {
        Self {
            store,
            hooks: Arc::new(NoopCacheHooks),
            clock: Arc::new(SystemClock),
            retention: None,
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn CacheHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Fixes the policy instead of reading it from the store on every prune.
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = Some(retention);
        self
    }

    pub fn store(&self) -> Arc<dyn AnswerStore> {
        Arc::clone(&self.store)
    }

    pub async fn lookup(
        &self,
        question: &str,
        preferences: &Preferences,
    ) -> Result<Option<CacheEntry>, CacheError> {
        self.lookup_key(&build_cache_key(question, preferences)).await
    }

    pub async fn lookup_key(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let value = self
            .store
            .get(key.as_str())
            .await
            .inspect_err(|error| self.hooks.on_store_failure("get", error))?;

        match normalize_entry(key.as_str(), value.as_ref()) {
            Some(entry) => {
                self.hooks.on_cache_hit(key.as_str());
                Ok(Some(entry))
            }
            None => {
                self.hooks.on_cache_miss(key.as_str());
                Ok(None)
            }
        }
    }

    /// Writes a finalized answer, then prunes.
    ///
    /// The key is built from `question`; the stored entry shows
    /// `display_question` when given (a follow-up embedded in the question,
    /// for example). Pruning is advisory: its failures go to the hooks and
    /// leave the written answer in place.
    pub async fn persist(
        &self,
        question: &str,
        display_question: Option<&str>,
        answer: &str,
        preferences: &Preferences,
    ) -> Result<PersistOutcome, CacheError> {
        if answer.trim().is_empty() {
            return Err(CacheError::invalid_request("answer must not be empty"));
        }

        let key = build_cache_key(question, preferences);
        let stored = StoredAnswer::new(
            display_question.unwrap_or(question),
            answer,
            preferences,
            self.clock.now_millis(),
        );
        self.store
            .set(key.as_str(), stored.to_value()?)
            .await
            .inspect_err(|error| self.hooks.on_store_failure("set", error))?;
        self.hooks.on_entry_persisted(key.as_str(), answer.len());

        let pruned = self.prune().await.unwrap_or_default();
        Ok(PersistOutcome { key, pruned })
    }

    /// Applies the retention policy to a fresh snapshot and removes the
    /// resulting keys in one batch.
    pub async fn prune(&self) -> Result<BTreeSet<String>, CacheError> {
        let policy = match self.retention {
            Some(policy) => policy,
            None => self.load_retention().await?,
        };
        if policy.is_disabled() {
            return Ok(BTreeSet::new());
        }

        let snapshot = self.snapshot().await?;
        let doomed = prune_keys(&snapshot, &policy, self.clock.now_millis());
        if doomed.is_empty() {
            return Ok(doomed);
        }

        let keys = doomed.iter().cloned().collect::<Vec<_>>();
        self.store
            .remove(&keys)
            .await
            .inspect_err(|error| self.hooks.on_store_failure("remove", error))?;
        self.hooks.on_entries_pruned(&keys);
        Ok(doomed)
    }

    pub async fn load_retention(&self) -> Result<RetentionPolicy, CacheError> {
        let value = self
            .store
            .get(HISTORY_RETENTION_KEY)
            .await
            .inspect_err(|error| self.hooks.on_store_failure("get", error))?;

        Ok(value
            .as_ref()
            .map(RetentionPolicy::from_value)
            .unwrap_or_default())
    }

    pub async fn save_retention(&self, policy: &RetentionPolicy) -> Result<(), CacheError> {
        self.store
            .set(HISTORY_RETENTION_KEY, policy.to_value())
            .await
            .inspect_err(|error| self.hooks.on_store_failure("set", error))
    }

    /// Cached answers, newest first.
    pub async fn history(&self) -> Result<Vec<CacheEntry>, CacheError> {
        Ok(renderable_entries(&self.snapshot().await?))
    }

    pub async fn clear(&self, keys: &[String]) -> Result<(), CacheError> {
        let keys = keys
            .iter()
            .filter(|key| !is_reserved_key(key))
            .cloned()
            .collect::<Vec<_>>();
        if keys.is_empty() {
            return Ok(());
        }

        self.store
            .remove(&keys)
            .await
            .inspect_err(|error| self.hooks.on_store_failure("remove", error))
    }

    /// Removes every key except reserved settings. Returns the removed keys.
    pub async fn clear_all(&self) -> Result<Vec<String>, CacheError> {
        let keys = self
            .snapshot()
            .await?
            .into_keys()
            .filter(|key| !is_reserved_key(key))
            .collect::<Vec<_>>();
        self.clear(&keys).await?;
        Ok(keys)
    }

    async fn snapshot(&self) -> Result<StoreSnapshot, CacheError> {
        self.store
            .get_all()
            .await
            .inspect_err(|error| self.hooks.on_store_failure("get_all", error))
    }
}

/// Access token cached in the store under `gptxAccessToken`.
#[derive(Clone)]
pub struct StoredAccessToken {
    store: Arc<dyn AnswerStore>,
}

impl StoredAccessToken {
    pub fn new(store: Arc<dyn AnswerStore>) -> Self {
        Self { store }
    }

    pub async fn save(&self, token: &str) -> Result<(), CacheError> {
        if token.trim().is_empty() {
            return Err(CacheError::invalid_request("access token must not be empty"));
        }
        self.store
            .set(ACCESS_TOKEN_KEY, Value::String(token.to_string()))
            .await
    }
}

impl CredentialSource for StoredAccessToken {
    fn resolve<'a>(&'a self) -> BoxFuture<'a, Result<TransportAuth, StreamError>> {
        Box::pin(async move {
            let value = self.store.get(ACCESS_TOKEN_KEY).await.map_err(|error| {
                StreamError::unauthorized(format!("failed to read access token: {error}"))
            })?;

            match value {
                Some(Value::String(token)) if !token.trim().is_empty() => {
                    Ok(TransportAuth::access_token(token))
                }
                _ => Err(StreamError::unauthorized("no access token available")),
            }
        })
    }

    fn invalidate<'a>(&'a self) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let keys = [ACCESS_TOKEN_KEY.to_string()];
            let _ = self.store.remove(&keys).await;
        })
    }
}
