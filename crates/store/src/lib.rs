//! Persistence for the orchestrator.
//!
//! [`Store`] wraps an injected [`StateStore`] backend with a reader/writer
//! gate: reads run concurrently, while every read-modify-write cycle holds
//! the single writer slot for its whole duration so no update is lost.

pub mod backend;
pub mod error;
pub mod models;
pub mod repositories;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{RwLock, RwLockWriteGuard};

use backend::{FileStore, StateStore};
use error::StoreError;

/// Key of the agents collection.
pub const AGENTS_KEY: &str = "agents";

/// Key of the jobs collection.
pub const JOBS_KEY: &str = "jobs";

/// Shared handle to the store, cloned into every handler.
pub type StorePool = Arc<Store>;

/// Gatekeeper around a [`StateStore`] backend.
pub struct Store {
    backend: Arc<dyn StateStore>,
    gate: RwLock<()>,
}

impl Store {
    pub fn new(backend: Arc<dyn StateStore>) -> StorePool {
        Arc::new(Self {
            backend,
            gate: RwLock::new(()),
        })
    }

    /// Location of the backend, for logs.
    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    /// Read and decode the document at `key` under the shared gate.
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        let _shared = self.gate.read().await;
        load(self.backend.as_ref(), key).await
    }

    /// Take the single writer slot. Held until the returned [`Txn`] drops.
    pub async fn begin(&self) -> Txn<'_> {
        Txn {
            backend: self.backend.as_ref(),
            _guard: self.gate.write().await,
        }
    }
}

/// Exclusive write section over the store.
///
/// Loads and saves inside one `Txn` observe no interleaved writers.
pub struct Txn<'a> {
    backend: &'a dyn StateStore,
    _guard: RwLockWriteGuard<'a, ()>,
}

impl Txn<'_> {
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        load(self.backend, key).await
    }

    pub async fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Serde {
            key: key.to_string(),
            source,
        })?;
        self.backend.write(key, &value).await
    }

    /// Whether a document exists under `key`.
    pub async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match self.backend.read(key).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

async fn load<T: DeserializeOwned>(backend: &dyn StateStore, key: &str) -> Result<T, StoreError> {
    let value = backend.read(key).await?;
    serde_json::from_value(value).map_err(|source| StoreError::Serde {
        key: key.to_string(),
        source,
    })
}

/// Open a file-backed store rooted at `dir`.
pub fn open_file_store(dir: &str) -> Result<StorePool, StoreError> {
    Ok(Store::new(Arc::new(FileStore::open(dir)?)))
}

/// Create the `agents` and `jobs` collections as empty mappings when
/// missing. Existing collections are left untouched.
pub async fn init_collections(store: &Store) -> Result<(), StoreError> {
    let txn = store.begin().await;
    for key in [AGENTS_KEY, JOBS_KEY] {
        if !txn.exists(key).await? {
            txn.save(key, &serde_json::Map::new()).await?;
            tracing::info!(key, "Initialized empty collection");
        }
    }
    Ok(())
}

/// Verify the store can be read.
pub async fn health_check(store: &Store) -> Result<(), StoreError> {
    store.read::<serde_json::Value>(AGENTS_KEY).await.map(|_| ())
}
