//! Key/value persistence backends.
//!
//! A [`StateStore`] maps relative keys (`agents`, `envs/env_…`) to JSON
//! documents. Writes replace the whole document atomically: a reader sees
//! either the previous value or the new one, never a partial write.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::StoreError;

/// File extension of every document written by [`FileStore`].
const EXTENSION: &str = "json";

/// Pluggable document storage.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the document stored under `key`.
    async fn read(&self, key: &str) -> Result<Value, StoreError>;

    /// Atomically replace the document stored under `key`.
    async fn write(&self, key: &str, value: &Value) -> Result<(), StoreError>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Keys are `/`-separated segments of `[A-Za-z0-9_-]`; nothing else can
/// reach the filesystem.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && key.split('/').all(|seg| {
            !seg.is_empty()
                && seg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

/// Stores each key as `<root>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a file store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            key: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        let mut path = self.root.clone();
        path.extend(key.split('/'));
        path.set_extension(EXTENSION);
        Ok(path)
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn read(&self, key: &str) -> Result<Value, StoreError> {
        let path = self.path_for(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.to_string()));
            }
            Err(source) => {
                return Err(StoreError::Io {
                    key: key.to_string(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Serde {
            key: key.to_string(),
            source,
        })
    }

    async fn write(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serde {
            key: key.to_string(),
            source,
        })?;

        let owned_key = key.to_string();
        tokio::task::spawn_blocking(move || {
            replace_file(&path, &bytes).map_err(|source| StoreError::Io {
                key: owned_key,
                source,
            })
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    fn describe(&self) -> String {
        format!("file:{}", self.root.display())
    }
}

/// Write `bytes` to a temp file beside `path`, flush it, then rename over
/// `path`.
///
/// The temp file is created with mode 0600 on Unix and the rename keeps it.
fn replace_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Memory store
// ---------------------------------------------------------------------------

/// In-process store for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Value, StoreError> {
        validate_key(key)?;
        self.docs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn write(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        validate_key(key)?;
        self.docs.write().await.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn keys_are_validated() {
        assert!(validate_key("agents").is_ok());
        assert!(validate_key("envs/env_0a1b").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("envs/../agents").is_err());
        assert!(validate_key("envs//x").is_err());
        assert!(validate_key("a b").is_err());
        assert!(validate_key("agents.json").is_err());
    }

    #[tokio::test]
    async fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let value = json!({"a": {"status": "online"}});

        store.write("agents", &value).await.unwrap();

        assert_eq!(store.read("agents").await.unwrap(), value);
        assert!(dir.path().join("agents.json").is_file());
    }

    #[tokio::test]
    async fn file_store_nested_keys_create_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.write("envs/env_abc", &json!({"K": "v"})).await.unwrap();

        assert!(dir.path().join("envs").join("env_abc.json").is_file());
        assert_eq!(store.read("envs/env_abc").await.unwrap()["K"], "v");
    }

    #[tokio::test]
    async fn file_store_overwrite_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.write("jobs", &json!({"n": 1})).await.unwrap();
        store.write("jobs", &json!({"n": 2})).await.unwrap();

        assert_eq!(store.read("jobs").await.unwrap()["n"], 2);
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_store_documents_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.write("agents", &json!({})).await.unwrap();

        let mode = std::fs::metadata(dir.path().join("agents.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn file_store_missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert_matches!(store.read("jobs").await, Err(StoreError::NotFound(k)) if k == "jobs");
    }

    #[tokio::test]
    async fn file_store_corrupt_document_is_serde_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jobs.json"), b"{not json").unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert_matches!(store.read("jobs").await, Err(StoreError::Serde { .. }));
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_matches!(store.read("agents").await, Err(StoreError::NotFound(_)));

        store.write("agents", &json!({"x": 1})).await.unwrap();
        assert_eq!(store.read("agents").await.unwrap(), json!({"x": 1}));
    }
}
