//! Record identifiers.
//!
//! Every record the files manager persists (file metadata documents and the bytes stored for
//! them under `FOLDER_PATH`) is keyed by a *canonical* UUID: **32 lowercase hexadecimal
//! characters**, no hyphens.
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! This is the same value `Uuid::new_v4().simple().to_string()` produces. Externally supplied
//! identifiers must already be canonical; [`RecordId::parse`] rejects anything else.
//!
//! Because a canonical id only contains hex digits it is always safe to join onto a storage
//! root: it can never contain a path separator or `..`.

mod record_id;

pub use record_id::{RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
