mod config;
pub mod migrations;

pub use config::{
    Config, DefaultsConfig, LedgerConfig, NotificationsConfig, PersistenceConfig, RewardsConfig,
    ScheduleConfig,
};

use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{ConfigError, StorageError};

/// Returns the data directory.
///
/// `KIDSCHORES_DATA_DIR` wins when set. Otherwise `~/.config/kidschores`,
/// or `~/.config/kidschores-dev` with `KIDSCHORES_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("KIDSCHORES_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("KIDSCHORES_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("kidschores-dev")
            } else {
                base_dir.join("kidschores")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Atomic load/save of JSON documents by key.
pub trait StorageBackend: Send {
    /// `Ok(None)` when nothing was stored under `key` yet.
    fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn save(&mut self, key: &str, doc: &Value) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// One `<key>.json` file per document, written via temp file + rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl StorageBackend for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.path(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path)(e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StorageError::Malformed {
                key: key.to_string(),
                source,
            })
    }

    fn save(&mut self, key: &str, doc: &Value) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;
        let path = self.path(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        let content = serde_json::to_vec_pretty(doc).map_err(|source| StorageError::Malformed {
            key: key.to_string(),
            source,
        })?;
        std::fs::write(&tmp, content).map_err(io_err(&tmp))?;
        std::fs::rename(&tmp, &path).map_err(io_err(&path))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&path)(e)),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    docs: HashMap<String, Value>,
    failing_saves: usize,
    saves: usize,
}

/// In-memory backend. Clones share contents, so a test can keep a handle
/// after giving one to the coordinator.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next `n` saves fail.
    pub fn fail_next_saves(&self, n: usize) {
        self.inner().failing_saves = n;
    }

    /// Successful saves so far.
    pub fn save_count(&self) -> usize {
        self.inner().saves
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner().docs.get(key).cloned()
    }

    pub fn put(&self, key: &str, doc: Value) {
        self.inner().docs.insert(key.to_string(), doc);
    }
}

impl StorageBackend for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.get(key))
    }

    fn save(&mut self, key: &str, doc: &Value) -> Result<(), StorageError> {
        let mut inner = self.inner();
        if inner.failing_saves > 0 {
            inner.failing_saves -= 1;
            return Err(StorageError::Injected(format!("save of '{key}' refused")));
        }
        inner.docs.insert(key.to_string(), doc.clone());
        inner.saves += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.inner().docs.remove(key);
        Ok(())
    }
}
