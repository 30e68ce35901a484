//! In-process backends.
//!
//! Both keep their data behind a `tokio::sync::Mutex` and can be switched offline, in which
//! case every call (including the liveness probe) fails with a transport error. That makes
//! outages and recoveries reproducible in tests.

use crate::cache::CacheBackend;
use crate::connection::Probe;
use crate::db::DocumentBackend;
use crate::error::BackendError;
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

fn check_online(offline: &AtomicBool) -> Result<(), BackendError> {
    if offline.load(Ordering::SeqCst) {
        Err(BackendError::transport("backend is offline"))
    } else {
        Ok(())
    }
}

/// Document collections held in memory.
///
/// Filters match on top-level field equality only. Inserting into a missing collection
/// creates it, as MongoDB does.
#[derive(Default)]
pub struct MemoryDocuments {
    collections: Mutex<BTreeMap<String, Vec<Document>>>,
    offline: AtomicBool,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates losing (`true`) or regaining (`false`) the server.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| document.get(key) == Some(expected))
}

#[async_trait]
impl Probe for MemoryDocuments {
    async fn ping(&self) -> Result<(), BackendError> {
        check_online(&self.offline)
    }
}

#[async_trait]
impl DocumentBackend for MemoryDocuments {
    async fn list_collections(&self) -> Result<Vec<String>, BackendError> {
        check_online(&self.offline)?;
        Ok(self.collections.lock().await.keys().cloned().collect())
    }

    async fn create_collection(&self, name: &str) -> Result<(), BackendError> {
        check_online(&self.offline)?;
        let mut collections = self.collections.lock().await;
        if collections.contains_key(name) {
            return Err(BackendError::already_exists(format!(
                "collection {} already exists",
                name
            )));
        }
        collections.insert(name.to_string(), Vec::new());
        Ok(())
    }

    async fn count_documents(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<u64, BackendError> {
        check_online(&self.offline)?;
        let collections = self.collections.lock().await;
        let count = collections
            .get(collection)
            .map(|documents| documents.iter().filter(|d| matches(d, &filter)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, BackendError> {
        check_online(&self.offline)?;
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|d| matches(d, &filter)))
            .cloned())
    }

    async fn insert_one(
        &self,
        collection: &str,
        mut document: Document,
    ) -> Result<Bson, BackendError> {
        check_online(&self.offline)?;
        let mut collections = self.collections.lock().await;
        let documents = collections.entry(collection.to_string()).or_default();

        let id = match document.get("_id") {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                document.insert("_id", id.clone());
                id
            }
        };

        if documents.iter().any(|d| d.get("_id") == Some(&id)) {
            return Err(BackendError::duplicate_key(format!(
                "duplicate key in {}: _id {}",
                collection, id
            )));
        }

        documents.push(document);
        Ok(id)
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64, BackendError> {
        check_online(&self.offline)?;
        let mut collections = self.collections.lock().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };
        match documents.iter().position(|d| matches(d, &filter)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

/// Key-value entries with expiry, held in memory.
///
/// Expiry is measured with `tokio::time::Instant`, so tests can drive it with a paused clock.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    offline: AtomicBool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates losing (`true`) or regaining (`false`) the server.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl Probe for MemoryCache {
    async fn ping(&self) -> Result<(), BackendError> {
        check_online(&self.offline)
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        check_online(&self.offline)?;
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((_, expires_at)) if Instant::now() >= *expires_at => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), BackendError> {
        check_online(&self.offline)?;
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        // Keys that are never read again would otherwise stay forever.
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(
            key.to_string(),
            (value.to_string(), now + Duration::from_secs(ttl_seconds)),
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), BackendError> {
        check_online(&self.offline)?;
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
