//! Store construction shared by the binaries.

use crate::cache::CacheStore;
use crate::config::{CoreConfig, StoreBackend};
use crate::constants::PROVISIONED_COLLECTIONS;
use crate::db::DocumentStore;
use crate::error::StoreResult;
use tokio::task::JoinHandle;

/// Both stores of one process.
#[derive(Clone)]
pub struct Stores {
    pub db: DocumentStore,
    pub cache: CacheStore,
}

impl Stores {
    /// Creates the stores for the configured backend and starts connecting them.
    ///
    /// Returns immediately; the stores report not alive until their setup completes.
    pub fn connect(config: &CoreConfig) -> Self {
        match config.backend() {
            StoreBackend::External => {
                let db = DocumentStore::new(config.db().clone(), config.timeouts());
                let cache = CacheStore::new(config.cache().clone(), config.timeouts());
                let _ = db.connect();
                let _ = cache.connect();
                Self { db, cache }
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory stores; nothing will be persisted");
                let (db, _) = DocumentStore::in_memory(config.timeouts());
                let (cache, _) = CacheStore::in_memory(config.timeouts());
                Self { db, cache }
            }
        }
    }

    /// Resolves once both stores have finished setup.
    ///
    /// Waits for both even when one fails early, so the state of each store is settled when
    /// this returns.
    ///
    /// # Errors
    ///
    /// Returns the document store's setup failure, otherwise the cache's.
    pub async fn ready(&self) -> StoreResult<()> {
        let (db, cache) = tokio::join!(self.db.ready(), self.cache.ready());
        db.and(cache)
    }

    /// Provisions the `users` and `files` collections once the document store is ready.
    ///
    /// Runs in the background; failures are logged; provisioning can be repeated safely.
    pub fn provision(&self) -> JoinHandle<StoreResult<Vec<String>>> {
        let db = self.db.clone();
        tokio::spawn(async move {
            let outcome = match db.ready().await {
                Ok(()) => db.ensure_collections(PROVISIONED_COLLECTIONS).await,
                Err(e) => Err(e),
            };
            match &outcome {
                Ok(created) if created.is_empty() => {
                    tracing::info!("Collections already provisioned")
                }
                Ok(created) => tracing::info!("Provisioned collections: {}", created.join(", ")),
                Err(e) => tracing::error!("Collection provisioning failed: {}", e),
            }
            outcome
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::MemoryDocuments;
    use crate::cache::CacheBackend;
    use crate::config::{CacheConfig, DbConfig, StoreTimeouts};
    use crate::db::DocumentBackend;
    use crate::error::BackendError;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    fn memory_config() -> CoreConfig {
        let vars = HashMap::from([("STORE_BACKEND", "memory")]);
        CoreConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_memory_stores_connect_and_provision() {
        let stores = Stores::connect(&memory_config());

        stores.ready().await.unwrap();
        let created = stores.provision().await.unwrap().unwrap();
        let again = stores.provision().await.unwrap().unwrap();

        assert!(stores.db.is_alive());
        assert!(stores.cache.is_alive());
        assert_eq!(created, vec!["files".to_string(), "users".to_string()]);
        assert!(again.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_waits_for_slow_store_when_other_fails_fast() {
        let stores = Stores {
            db: DocumentStore::new(DbConfig::default(), StoreTimeouts::default()),
            cache: CacheStore::new(CacheConfig::default(), StoreTimeouts::default()),
        };
        let _ = stores.db.connect_with(|| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(Arc::new(MemoryDocuments::new()) as Arc<dyn DocumentBackend>)
        });
        let _ = stores.cache.connect_with(|| async {
            Err::<Arc<dyn CacheBackend>, _>(BackendError::transport("connection refused"))
        });

        let outcome = stores.ready().await;

        assert!(outcome.is_err());
        assert!(stores.db.is_alive());
        assert!(!stores.cache.is_alive());
    }
}
