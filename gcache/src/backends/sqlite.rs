use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use gcommon::BoxFuture;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

use crate::error::CacheError;
use crate::history::StoreSnapshot;
use crate::store::AnswerStore;

#[derive(Debug)]
pub struct SqliteAnswerStore {
    connection: Mutex<Connection>,
}

impl SqliteAnswerStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|error| {
                CacheError::storage(format!("failed to create sqlite parent directory: {error}"))
            })?;
        }

        let connection = Connection::open(path).map_err(|error| {
            CacheError::storage(format!("failed to open sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    pub fn new_in_memory() -> Result<Self, CacheError> {
        let connection = Connection::open_in_memory().map_err(|error| {
            CacheError::storage(format!("failed to open in-memory sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self, CacheError> {
        connection
            .busy_timeout(Duration::from_secs(5))
            .map_err(|error| {
                CacheError::storage(format!("failed to configure sqlite busy timeout: {error}"))
            })?;
        let store = Self {
            connection: Mutex::new(connection),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CacheError> {
        self.connection
            .lock()
            .map_err(|_| CacheError::storage("sqlite answer store lock poisoned"))
    }

    fn initialize_schema(&self) -> Result<(), CacheError> {
        let conn = self.connection()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS answer_store (
                key TEXT PRIMARY KEY,
                value_json TEXT NOT NULL
            );
            ",
        )
        .map_err(|error| {
            CacheError::storage(format!("failed to initialize sqlite schema: {error}"))
        })
    }
}

fn decode_value(key: &str, raw: &str) -> Result<Value, CacheError> {
    serde_json::from_str(raw).map_err(|error| {
        CacheError::storage(format!("stored value for '{key}' is not valid json: {error}"))
    })
}

impl AnswerStore for SqliteAnswerStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>, CacheError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let raw = conn
                .query_row(
                    "SELECT value_json FROM answer_store WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(|error| {
                    CacheError::storage(format!("failed to query stored value: {error}"))
                })?;

            raw.map(|raw| decode_value(key, &raw)).transpose()
        })
    }

    fn get_all<'a>(&'a self) -> BoxFuture<'a, Result<StoreSnapshot, CacheError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let mut statement = conn
                .prepare("SELECT key, value_json FROM answer_store ORDER BY key ASC")
                .map_err(|error| {
                    CacheError::storage(format!("failed to prepare store snapshot query: {error}"))
                })?;
            let rows = statement
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(|error| {
                    CacheError::storage(format!("failed to query store snapshot: {error}"))
                })?;

            let mut snapshot = StoreSnapshot::new();
            for row in rows {
                let (key, raw) = row.map_err(|error| {
                    CacheError::storage(format!("failed to decode store row: {error}"))
                })?;
                let value = decode_value(&key, &raw)?;
                snapshot.insert(key, value);
            }

            Ok(snapshot)
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: Value) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            let raw = serde_json::to_string(&value).map_err(|error| {
                CacheError::invalid_request(format!("failed to serialize stored value: {error}"))
            })?;
            let conn = self.connection()?;
            conn.execute(
                "
                INSERT INTO answer_store (key, value_json) VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json
                ",
                params![key, raw],
            )
            .map_err(|error| CacheError::storage(format!("failed to write stored value: {error}")))?;
            Ok(())
        })
    }

    fn remove<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            if keys.is_empty() {
                return Ok(());
            }

            let mut conn = self.connection()?;
            let tx = conn.transaction().map_err(|error| {
                CacheError::storage(format!("failed to begin removal transaction: {error}"))
            })?;
            {
                let mut statement = tx
                    .prepare("DELETE FROM answer_store WHERE key = ?1")
                    .map_err(|error| {
                        CacheError::storage(format!("failed to prepare removal: {error}"))
                    })?;
                for key in keys {
                    statement.execute(params![key]).map_err(|error| {
                        CacheError::storage(format!("failed to remove stored value: {error}"))
                    })?;
                }
            }
            tx.commit().map_err(|error| {
                CacheError::storage(format!("failed to commit removal transaction: {error}"))
            })
        })
    }
}

pub(crate) fn default_sqlite_path() -> PathBuf {
    if let Some(explicit) = std::env::var_os("GPTX_SQLITE_PATH") {
        return PathBuf::from(explicit);
    }

    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        return PathBuf::from(home).join(".gptx").join("answers.sqlite3");
    }

    PathBuf::from("gptx-answers.sqlite3")
}
