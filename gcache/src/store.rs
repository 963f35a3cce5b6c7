//! Answer store trait and in-memory store implementation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use gcommon::BoxFuture;
use serde_json::Value;

use crate::backends::filesystem::FilesystemAnswerStore;
use crate::backends::sqlite::default_sqlite_path;
use crate::error::CacheError;
use crate::history::StoreSnapshot;

pub use crate::backends::sqlite::SqliteAnswerStore;

/// Key-value persistence shared by cached answers and settings.
///
/// Writes replace the whole value for a key; there are no partial merges.
pub trait AnswerStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>, CacheError>>;

    fn get_all<'a>(&'a self) -> BoxFuture<'a, Result<StoreSnapshot, CacheError>>;

    fn set<'a>(&'a self, key: &'a str, value: Value) -> BoxFuture<'a, Result<(), CacheError>>;

    /// Removes every listed key in one batch. Missing keys are ignored.
    fn remove<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<(), CacheError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerStoreConfig {
    InMemory,
    Filesystem { path: PathBuf },
    Sqlite { path: PathBuf },
}

impl Default for AnswerStoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

pub fn create_answer_store(config: AnswerStoreConfig) -> Result<Arc<dyn AnswerStore>, CacheError> {
    match config {
        AnswerStoreConfig::InMemory => Ok(Arc::new(InMemoryAnswerStore::new())),
        AnswerStoreConfig::Filesystem { path } => Ok(Arc::new(FilesystemAnswerStore::new(path)?)),
        AnswerStoreConfig::Sqlite { path } => Ok(Arc::new(SqliteAnswerStore::new(path)?)),
    }
}

pub fn create_default_answer_store() -> Result<Arc<dyn AnswerStore>, CacheError> {
    create_answer_store(AnswerStoreConfig::default())
}

#[derive(Debug, Default)]
pub struct InMemoryAnswerStore {
    values: Mutex<BTreeMap<String, Value>>,
}

impl InMemoryAnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
        }
    }

    fn values(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Value>>, CacheError> {
        self.values
            .lock()
            .map_err(|_| CacheError::storage("in-memory answer store lock poisoned"))
    }
}

impl AnswerStore for InMemoryAnswerStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>, CacheError>> {
        Box::pin(async move { Ok(self.values()?.get(key).cloned()) })
    }

    fn get_all<'a>(&'a self) -> BoxFuture<'a, Result<StoreSnapshot, CacheError>> {
        Box::pin(async move { Ok(self.values()?.clone()) })
    }

    fn set<'a>(&'a self, key: &'a str, value: Value) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            self.values()?.insert(key.to_string(), value);
            Ok(())
        })
    }

    fn remove<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            let mut values = self.values()?;
            for key in keys {
                values.remove(key);
            }
            Ok(())
        })
    }
}
