//! Key-value cache access.

use crate::backends::memory::MemoryCache;
use crate::backends::redis::RedisBackend;
use crate::config::{CacheConfig, StoreTimeouts};
use crate::connection::{ConnectionCell, ConnectionState, Probe};
use crate::constants::CACHE_STORE_NAME;
use crate::error::{BackendError, StoreError, StoreResult};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Operations a key-value cache must provide.
#[async_trait]
pub trait CacheBackend: Probe {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Stores `value` under `key` for `ttl_seconds`.
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), BackendError>;

    /// Removes `key`; removing an absent key succeeds.
    async fn del(&self, key: &str) -> Result<(), BackendError>;
}

/// Shared handle to the key-value cache.
///
/// Like [`crate::db::DocumentStore`], the cache starts disconnected, connects in the
/// background and fails fast instead of waiting. A transport error on any call flips
/// [`CacheStore::is_alive`] to `false` before the call returns.
#[derive(Clone)]
pub struct CacheStore {
    cell: Arc<ConnectionCell<dyn CacheBackend>>,
    config: CacheConfig,
}

impl CacheStore {
    pub fn new(config: CacheConfig, timeouts: StoreTimeouts) -> Self {
        Self {
            cell: ConnectionCell::new(CACHE_STORE_NAME, timeouts),
            config,
        }
    }

    /// Starts connecting to the Redis server named by the configuration. Returns immediately.
    pub fn connect(&self) -> JoinHandle<StoreResult<()>> {
        let uri = self.config.uri();
        tracing::info!(
            "Connecting to {} at {}:{}",
            CACHE_STORE_NAME,
            self.config.host,
            self.config.port
        );
        self.connect_with(move || {
            let uri = uri.clone();
            async move {
                let backend = RedisBackend::connect(&uri).await?;
                Ok(Arc::new(backend) as Arc<dyn CacheBackend>)
            }
        })
    }

    pub fn connect_with<C, F>(&self, connector: C) -> JoinHandle<StoreResult<()>>
    where
        C: Fn() -> F + Send + Sync + 'static,
        F: Future<Output = Result<Arc<dyn CacheBackend>, BackendError>> + Send + 'static,
    {
        self.cell.connect(connector)
    }

    pub fn connect_to(&self, backend: Arc<dyn CacheBackend>) -> JoinHandle<StoreResult<()>> {
        self.connect_with(move || std::future::ready(Ok(Arc::clone(&backend))))
    }

    /// Connected to a fresh in-memory cache.
    pub fn in_memory(timeouts: StoreTimeouts) -> (Self, JoinHandle<StoreResult<()>>) {
        let store = Self::new(CacheConfig::default(), timeouts);
        let setup = store.connect_to(Arc::new(MemoryCache::new()));
        (store, setup)
    }

    pub async fn ready(&self) -> StoreResult<()> {
        self.cell.ready().await
    }

    /// True only while connected.
    pub fn is_alive(&self) -> bool {
        self.cell.is_alive()
    }

    pub fn state(&self) -> ConnectionState {
        self.cell.state()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Value stored under `key`, or `None` if absent or expired.
    ///
    /// # Errors
    ///
    /// A miss is not an error. Returns `StoreError::Cache` on transport failure,
    /// `StoreError::NotReady` before setup completes.
    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.cell
            .run("get", |cache| async move { cache.get(key).await })
            .await?
            .map_err(cache_error)
    }

    /// Stores `value` under `key` until `ttl_seconds` have passed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Cache` if `ttl_seconds` is zero or the cache fails.
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
        if ttl_seconds == 0 {
            return Err(StoreError::Cache(format!(
                "ttl for {} must be at least one second",
                key
            )));
        }

        self.cell
            .run("set", |cache| async move {
                cache.set_ex(key, value, ttl_seconds).await
            })
            .await?
            .map_err(cache_error)
    }

    /// Removes `key`. Removing an absent key is not an error.
    pub async fn del(&self, key: &str) -> StoreResult<()> {
        self.cell
            .run("del", |cache| async move { cache.del(key).await })
            .await?
            .map_err(cache_error)
    }
}

fn cache_error(e: BackendError) -> StoreError {
    StoreError::Cache(e.to_string())
}
