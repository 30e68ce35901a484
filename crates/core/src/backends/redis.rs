//! Redis cache backend over a managed async connection.
//!
//! `ConnectionManager` replaces a dropped connection on its own, so a heartbeat ping on the
//! same handle starts succeeding again once the server is back.

use crate::cache::CacheBackend;
use crate::connection::Probe;
use crate::error::BackendError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};

pub struct RedisBackend {
    connection: ConnectionManager,
}

impl RedisBackend {
    /// Opens a managed connection to `uri`.
    pub async fn connect(uri: &str) -> Result<Self, BackendError> {
        let client = redis::Client::open(uri).map_err(classify)?;
        let connection = client.get_connection_manager().await.map_err(classify)?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl Probe for RedisBackend {
    async fn ping(&self) -> Result<(), BackendError> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(classify)?;
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let mut conn = self.connection.clone();
        conn.get(key).await.map_err(classify)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), BackendError> {
        let mut conn = self.connection.clone();
        let _: () = conn.set_ex(key, value, ttl_seconds).await.map_err(classify)?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), BackendError> {
        let mut conn = self.connection.clone();
        let _: u64 = conn.del(key).await.map_err(classify)?;
        Ok(())
    }
}

fn classify(err: RedisError) -> BackendError {
    if err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout()
    {
        BackendError::transport(err.to_string())
    } else {
        BackendError::rejected(err.to_string())
    }
}
