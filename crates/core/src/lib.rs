//! # Files Manager Core
//!
//! Persistence access layer and request-level services for the files manager.
//!
//! - [`db::DocumentStore`] owns the MongoDB connection (users and file metadata)
//! - [`cache::CacheStore`] owns the Redis connection
//! - [`stats::StatsService`], [`users::UserService`] and [`uploads::UploadService`] build the
//!   request operations on top of the stores and the byte storage in `fm-files`
//!
//! Both stores start disconnected, connect in the background and never block an operation
//! waiting for a connection; see [`connection`] for the lifecycle.
//!
//! **No API concerns**: HTTP routing and wire formats belong in `api-rest` and `api-shared`.

pub mod backends;
pub mod cache;
pub mod config;
pub mod connection;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod startup;
pub mod stats;
pub mod uploads;
pub mod users;
pub mod validation;

#[cfg(test)]
mod testing;

pub use cache::{CacheBackend, CacheStore};
pub use config::{CacheConfig, CoreConfig, DbConfig, StoreBackend, StoreTimeouts};
pub use connection::{ConnectionState, Probe};
pub use db::{Collection, DocumentBackend, DocumentStore};
pub use error::{
    BackendError, BackendErrorKind, ConfigError, InsertionFailure, ServiceError, ServiceResult,
    StoreError, StoreResult,
};
pub use fm_files::FilesService;
pub use fm_uuid::RecordId;
pub use models::{CreatedUser, FileRecord, FileType, User};
pub use startup::Stores;
pub use stats::{Stats, StatsService, Status};
pub use uploads::{UploadRequest, UploadService};
pub use users::{PasswordHasher, Sha256PasswordHasher, UserService};

/// Re-exported so callers can build filters without depending on the driver directly.
pub use mongodb::bson;
