//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the stores and
//! services. Core code never reads process-wide environment variables while handling a
//! request; binaries call [`CoreConfig::from_lookup`] with `std::env::var` and tests call it
//! with a map.

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_DB_DATABASE, DEFAULT_DB_HOST, DEFAULT_DB_PORT,
    DEFAULT_FOLDER_PATH, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_OPERATION_TIMEOUT, DEFAULT_PORT,
    DEFAULT_REDIS_HOST, DEFAULT_REDIS_PORT,
};
use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Document database location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl DbConfig {
    /// Connection string understood by the MongoDB driver.
    pub fn uri(&self) -> String {
        format!("mongodb://{}:{}/{}", self.host, self.port, self.database)
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DB_HOST.into(),
            port: DEFAULT_DB_PORT,
            database: DEFAULT_DB_DATABASE.into(),
        }
    }
}

/// Key-value cache location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    pub host: String,
    pub port: u16,
}

impl CacheConfig {
    pub fn uri(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_REDIS_HOST.into(),
            port: DEFAULT_REDIS_PORT,
        }
    }
}

/// Bounds applied to connection setup, to every store operation and to the liveness probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreTimeouts {
    pub connect: Duration,
    pub operation: Duration,
    pub heartbeat: Duration,
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        Self {
            connect: DEFAULT_CONNECT_TIMEOUT,
            operation: DEFAULT_OPERATION_TIMEOUT,
            heartbeat: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

/// Which implementation backs the stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// MongoDB and Redis servers.
    #[default]
    External,
    /// Process-local in-memory stores, for development and tests.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "external" => Ok(StoreBackend::External),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("expected 'external' or 'memory', got '{}'", other)),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    db: DbConfig,
    cache: CacheConfig,
    timeouts: StoreTimeouts,
    backend: StoreBackend,
    folder_path: PathBuf,
    port: u16,
}

impl CoreConfig {
    /// Resolves every setting through `lookup`, falling back to the defaults.
    ///
    /// Keys: `DB_HOST`, `DB_PORT`, `DB_DATABASE`, `REDIS_HOST`, `REDIS_PORT`, `FOLDER_PATH`,
    /// `PORT`, `STORE_BACKEND`, `STORE_CONNECT_TIMEOUT_MS`, `STORE_OPERATION_TIMEOUT_MS`,
    /// `STORE_HEARTBEAT_MS`. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a numeric key does not parse, a duration is zero,
    /// or `STORE_BACKEND` names an unknown backend.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let db = DbConfig {
            host: value("DB_HOST").unwrap_or_else(|| DEFAULT_DB_HOST.into()),
            port: parse_or("DB_PORT", value("DB_PORT"), DEFAULT_DB_PORT)?,
            database: value("DB_DATABASE").unwrap_or_else(|| DEFAULT_DB_DATABASE.into()),
        };

        let cache = CacheConfig {
            host: value("REDIS_HOST").unwrap_or_else(|| DEFAULT_REDIS_HOST.into()),
            port: parse_or("REDIS_PORT", value("REDIS_PORT"), DEFAULT_REDIS_PORT)?,
        };

        let timeouts = StoreTimeouts {
            connect: millis_or(
                "STORE_CONNECT_TIMEOUT_MS",
                value("STORE_CONNECT_TIMEOUT_MS"),
                DEFAULT_CONNECT_TIMEOUT,
            )?,
            operation: millis_or(
                "STORE_OPERATION_TIMEOUT_MS",
                value("STORE_OPERATION_TIMEOUT_MS"),
                DEFAULT_OPERATION_TIMEOUT,
            )?,
            heartbeat: millis_or(
                "STORE_HEARTBEAT_MS",
                value("STORE_HEARTBEAT_MS"),
                DEFAULT_HEARTBEAT_INTERVAL,
            )?,
        };

        let backend = match value("STORE_BACKEND") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::InvalidValue {
                key: "STORE_BACKEND",
                reason,
            })?,
            None => StoreBackend::default(),
        };

        Ok(Self {
            db,
            cache,
            timeouts,
            backend,
            folder_path: value("FOLDER_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FOLDER_PATH)),
            port: parse_or("PORT", value("PORT"), DEFAULT_PORT)?,
        })
    }

    pub fn db(&self) -> &DbConfig {
        &self.db
    }

    pub fn cache(&self) -> &CacheConfig {
        &self.cache
    }

    pub fn timeouts(&self) -> StoreTimeouts {
        self.timeouts
    }

    pub fn backend(&self) -> StoreBackend {
        self.backend
    }

    pub fn folder_path(&self) -> &Path {
        &self.folder_path
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db: DbConfig::default(),
            cache: CacheConfig::default(),
            timeouts: StoreTimeouts::default(),
            backend: StoreBackend::default(),
            folder_path: PathBuf::from(DEFAULT_FOLDER_PATH),
            port: DEFAULT_PORT,
        }
    }
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            reason: format!("'{}': {}", raw, e),
        }),
        None => Ok(default),
    }
}

fn millis_or(
    key: &'static str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let millis: u64 = parse_or(key, value, default.as_millis() as u64)?;
    if millis == 0 {
        return Err(ConfigError::InvalidValue {
            key,
            reason: "must be greater than zero".into(),
        });
    }
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<CoreConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CoreConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let cfg = config_from(&[]).unwrap();

        assert_eq!(cfg.db().uri(), "mongodb://localhost:27017/files_manager");
        assert_eq!(cfg.cache().uri(), "redis://localhost:6379/");
        assert_eq!(cfg.folder_path(), Path::new("/tmp/files_manager"));
        assert_eq!(cfg.port(), 5000);
        assert_eq!(cfg.backend(), StoreBackend::External);
        assert_eq!(cfg.timeouts(), StoreTimeouts::default());
    }

    #[test]
    fn test_each_key_is_defaulted_independently() {
        let cfg = config_from(&[("DB_PORT", "27018"), ("FOLDER_PATH", "/srv/files")]).unwrap();

        assert_eq!(cfg.db().host, "localhost");
        assert_eq!(cfg.db().port, 27018);
        assert_eq!(cfg.db().database, "files_manager");
        assert_eq!(cfg.folder_path(), Path::new("/srv/files"));
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let cfg = config_from(&[("DB_HOST", "   "), ("PORT", "")]).unwrap();

        assert_eq!(cfg.db().host, "localhost");
        assert_eq!(cfg.port(), 5000);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();

        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "PORT"),
        }
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(config_from(&[("STORE_OPERATION_TIMEOUT_MS", "0")]).is_err());
    }

    #[test]
    fn test_timeouts_and_backend_are_parsed() {
        let cfg = config_from(&[
            ("STORE_BACKEND", "Memory"),
            ("STORE_CONNECT_TIMEOUT_MS", "250"),
            ("STORE_HEARTBEAT_MS", "1000"),
        ])
        .unwrap();

        assert_eq!(cfg.backend(), StoreBackend::Memory);
        assert_eq!(cfg.timeouts().connect, Duration::from_millis(250));
        assert_eq!(cfg.timeouts().heartbeat, Duration::from_secs(1));
        assert_eq!(cfg.timeouts().operation, DEFAULT_OPERATION_TIMEOUT);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(config_from(&[("STORE_BACKEND", "postgres")]).is_err());
    }
}
