//! Storage-root scoped byte storage.
//!
//! [`FilesService`] owns a canonicalised storage root and maps each [`RecordId`] to exactly one
//! file directly beneath it. Ids are canonical hex so the derived path can never leave the
//! root.
//!
//! All operations use blocking `std::fs`; async callers should run them through
//! `tokio::task::spawn_blocking`.

use crate::FilesError;
use fm_uuid::RecordId;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Service for storing and retrieving uploaded bytes
#[derive(Debug, Clone)]
pub struct FilesService {
    /// Canonicalised storage root
    root_directory: PathBuf,
}

impl FilesService {
    /// Creates a `FilesService` rooted at `root_directory`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::InvalidRootDirectory` if:
    /// - the path exists but is not a directory,
    /// - the directory cannot be created,
    /// - path canonicalisation fails.
    pub fn new(root_directory: &Path) -> Result<Self, FilesError> {
        if root_directory.exists() && !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        fs::create_dir_all(root_directory).map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot create {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self { root_directory })
    }

    /// Writes `bytes` as the stored payload of `id`.
    ///
    /// The file is created exclusively. If writing fails part way the partial file is removed
    /// so a later retry starts clean.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - bytes are already stored for `id` (`FileAlreadyExists`),
    /// - the file cannot be created or written (`Io`).
    pub fn write(&self, id: &RecordId, bytes: &[u8]) -> Result<PathBuf, FilesError> {
        let path = self.path_for(id);

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(FilesError::FileAlreadyExists(*id));
            }
            Err(e) => return Err(FilesError::Io(e)),
        };

        if let Err(e) = file.write_all(bytes).and_then(|()| file.sync_all()) {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&path) {
                tracing::warn!(
                    "failed to remove partial file {}: {}",
                    path.display(),
                    cleanup
                );
            }
            return Err(FilesError::Io(e));
        }

        Ok(path)
    }

    /// Reads the stored payload of `id`.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::NotFound` if nothing is stored for `id`, or `FilesError::Io` if the
    /// file cannot be read.
    pub fn read(&self, id: &RecordId) -> Result<Vec<u8>, FilesError> {
        match fs::read(self.path_for(id)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(FilesError::NotFound(*id)),
            Err(e) => Err(FilesError::Io(e)),
        }
    }

    /// Returns `<root>/<id>`.
    #[must_use]
    pub fn path_for(&self, id: &RecordId) -> PathBuf {
        self.root_directory.join(id.to_string())
    }

    /// Returns the canonicalised storage root.
    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_creates_missing_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("nested").join("files_manager");

        let service = FilesService::new(&root).unwrap();

        assert!(root.is_dir());
        assert!(service.root_directory().ends_with("files_manager"));
    }

    #[test]
    fn test_new_rejects_file_as_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("file.txt");
        fs::write(&root, "not a directory").unwrap();

        let service = FilesService::new(&root);

        assert!(matches!(service, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_path_for_is_flat_under_root() {
        let temp = TempDir::new().unwrap();
        let service = FilesService::new(temp.path()).unwrap();
        let id = RecordId::parse("550e8400e29b41d4a716446655440000").unwrap();

        let path = service.path_for(&id);

        assert_eq!(path.parent(), Some(service.root_directory()));
        assert!(path.ends_with("550e8400e29b41d4a716446655440000"));
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let service = FilesService::new(temp.path()).unwrap();
        let id = RecordId::new();

        let path = service.write(&id, b"Hello, World!").unwrap();

        assert!(path.exists());
        assert_eq!(service.read(&id).unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_write_binary_payload() {
        let temp = TempDir::new().unwrap();
        let service = FilesService::new(temp.path()).unwrap();
        let id = RecordId::new();
        let binary: Vec<u8> = (0..=255).collect();

        service.write(&id, &binary).unwrap();

        assert_eq!(service.read(&id).unwrap(), binary);
    }

    #[test]
    fn test_write_is_immutable() {
        let temp = TempDir::new().unwrap();
        let service = FilesService::new(temp.path()).unwrap();
        let id = RecordId::new();

        service.write(&id, b"first").unwrap();
        let second = service.write(&id, b"second");

        assert!(matches!(second, Err(FilesError::FileAlreadyExists(existing)) if existing == id));
        assert_eq!(service.read(&id).unwrap(), b"first");
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let service = FilesService::new(temp.path()).unwrap();

        let result = service.read(&RecordId::new());

        assert!(matches!(result, Err(FilesError::NotFound(_))));
    }

    #[test]
    fn test_write_fails_when_root_removed() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("store");
        let service = FilesService::new(&root).unwrap();
        fs::remove_dir_all(service.root_directory()).unwrap();

        let result = service.write(&RecordId::new(), b"bytes");

        assert!(matches!(result, Err(FilesError::Io(_))));
    }
}
