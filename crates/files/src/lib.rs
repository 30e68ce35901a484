//! File byte storage
//!
//! Uploaded payloads are kept outside the document store: metadata lives in the `files`
//! collection while the raw bytes are written to one file per record under a storage root
//! (`FOLDER_PATH`).
//!
//! ```text
//! <FOLDER_PATH>/
//! ├── 550e8400e29b41d4a716446655440000
//! └── 9b2d0c1e6f3a4b58a0c7d1e2f3a4b5c6
//! ```
//!
//! Stored bytes are immutable: writing a second payload for an id that already has one fails.
//!
//! ## Example Usage
//!
//! ```no_run
//! use fm_files::FilesService;
//! use fm_uuid::RecordId;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = FilesService::new(Path::new("/tmp/files_manager"))?;
//! let id = RecordId::new();
//! service.write(&id, b"hello")?;
//! assert_eq!(service.read(&id)?, b"hello");
//! # Ok(())
//! # }
//! ```

mod files;

pub use files::FilesService;
pub use fm_uuid::RecordId;

/// Errors that can occur during file operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory could not be created or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Bytes already exist for this record (immutability violation)
    #[error("File {0} already exists in storage")]
    FileAlreadyExists(RecordId),

    /// No bytes are stored for this record
    #[error("File {0} not found in storage")]
    NotFound(RecordId),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
