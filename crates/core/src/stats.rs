//! Health and usage reporting.

use crate::cache::CacheStore;
use crate::db::DocumentStore;
use crate::error::ServiceResult;
use serde::Serialize;

/// Liveness of each store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Status {
    pub db: bool,
    pub redis: bool,
}

/// Record counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub users: u64,
    pub files: u64,
}

#[derive(Clone)]
pub struct StatsService {
    db: DocumentStore,
    cache: CacheStore,
}

impl StatsService {
    pub fn new(db: DocumentStore, cache: CacheStore) -> Self {
        Self { db, cache }
    }

    /// Current liveness of both stores. Never fails.
    pub fn status(&self) -> Status {
        Status {
            db: self.db.is_alive(),
            redis: self.cache.is_alive(),
        }
    }

    /// Number of users and files, zero while the document store is still connecting.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the document store has failed or a count fails.
    pub async fn stats(&self) -> ServiceResult<Stats> {
        let (users, files) = tokio::try_join!(self.db.count_users(), self.db.count_files())?;
        Ok(Stats { users, files })
    }
}
