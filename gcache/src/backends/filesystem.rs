use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use gcommon::BoxFuture;
use serde_json::Value;

use crate::error::CacheError;
use crate::history::StoreSnapshot;
use crate::store::AnswerStore;

/// Whole store kept as one JSON object file, replaced atomically on write.
#[derive(Debug)]
pub struct FilesystemAnswerStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FilesystemAnswerStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|error| {
                CacheError::storage(format!("failed to create answer store directory: {error}"))
            })?;
        }

        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoreSnapshot, CacheError> {
        if !self.path.exists() {
            return Ok(StoreSnapshot::new());
        }

        let bytes = fs::read(&self.path).map_err(|error| {
            CacheError::storage(format!("failed to read answer store file: {error}"))
        })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(StoreSnapshot::new());
        }

        serde_json::from_slice::<StoreSnapshot>(&bytes).map_err(|error| {
            CacheError::storage(format!("failed to deserialize answer store: {error}"))
        })
    }

    fn save(&self, snapshot: &StoreSnapshot) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec_pretty(snapshot).map_err(|error| {
            CacheError::storage(format!("failed to serialize answer store: {error}"))
        })?;

        write_atomic(&self.path, &bytes)
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, CacheError> {
        self.lock
            .lock()
            .map_err(|_| CacheError::storage("filesystem answer store lock poisoned"))
    }
}

impl AnswerStore for FilesystemAnswerStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>, CacheError>> {
        Box::pin(async move {
            let _guard = self.guard()?;
            Ok(self.load()?.remove(key))
        })
    }

    fn get_all<'a>(&'a self) -> BoxFuture<'a, Result<StoreSnapshot, CacheError>> {
        Box::pin(async move {
            let _guard = self.guard()?;
            self.load()
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: Value) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            let _guard = self.guard()?;
            let mut snapshot = self.load()?;
            snapshot.insert(key.to_string(), value);
            self.save(&snapshot)
        })
    }

    fn remove<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            if keys.is_empty() {
                return Ok(());
            }

            let _guard = self.guard()?;
            let mut snapshot = self.load()?;
            let before = snapshot.len();
            for key in keys {
                snapshot.remove(key);
            }

            if snapshot.len() == before {
                return Ok(());
            }
            self.save(&snapshot)
        })
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).map_err(|error| {
        CacheError::storage(format!("failed to write temporary answer store file: {error}"))
    })?;

    // Rename replaces the target in one step; the old file stays until then.
    fs::rename(&tmp, path).map_err(|error| {
        CacheError::storage(format!("failed to finalize answer store file: {error}"))
    })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::write_atomic;

    fn temp_root(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("gcache-write-{label}-{nanos}"))
    }

    #[test]
    fn write_replaces_existing_file_in_place() {
        let root = temp_root("replace");
        fs::create_dir_all(&root).expect("dir should create");
        let path = root.join("answers.json");
        fs::write(&path, b"{\"old\":1}").expect("file should write");

        write_atomic(&path, b"{\"new\":2}").expect("write should replace");

        assert_eq!(fs::read(&path).expect("file should read"), b"{\"new\":2}");
        assert!(!path.with_extension("json.tmp").exists());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn failed_write_keeps_the_previous_file() {
        let root = temp_root("keep");
        fs::create_dir_all(&root).expect("dir should create");
        let path = root.join("answers.json");
        fs::write(&path, b"{\"old\":1}").expect("file should write");
        // A directory where the temporary file goes makes the write fail.
        fs::create_dir_all(path.with_extension("json.tmp")).expect("dir should create");

        assert!(write_atomic(&path, b"{\"new\":2}").is_err());
        assert_eq!(fs::read(&path).expect("file should read"), b"{\"old\":1}");
        let _ = fs::remove_dir_all(root);
    }
}
