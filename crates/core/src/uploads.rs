//! File and folder uploads.
//!
//! An upload stores a metadata record in the `files` collection and, for files and images,
//! the decoded bytes under the storage root. Metadata goes first so that no bytes are ever
//! written for a record the store refused. If the bytes cannot be written the metadata
//! record is deleted again.

use crate::constants::{FILES_COLLECTION, ROOT_PARENT_ID};
use crate::db::DocumentStore;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{FileRecord, FileType};
use crate::validation::{decode_base64, required};
use fm_files::FilesService;
use fm_uuid::RecordId;
use mongodb::bson::doc;

/// Raw upload fields as received from a client.
#[derive(Clone, Debug, Default)]
pub struct UploadRequest {
    pub name: Option<String>,
    pub file_type: Option<String>,
    pub parent_id: Option<String>,
    pub is_public: Option<bool>,
    /// Base64 payload; ignored for folders.
    pub data: Option<String>,
    pub owner_id: Option<String>,
}

#[derive(Clone)]
pub struct UploadService {
    db: DocumentStore,
    storage: FilesService,
}

impl UploadService {
    pub fn new(db: DocumentStore, storage: FilesService) -> Self {
        Self { db, storage }
    }

    pub fn storage(&self) -> &FilesService {
        &self.storage
    }

    /// Validates and stores an upload.
    ///
    /// # Returns
    ///
    /// The stored metadata record.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` if:
    /// - `name`, `type` or (except for folders) `data` is missing (`MissingField`),
    /// - `type` is not file, folder or image, or `data` is not base64 (`InvalidInput`),
    /// - the metadata insert fails (`Store`), in which case nothing was written,
    /// - the bytes cannot be written (`Files`), after the metadata has been removed again,
    /// - removing the metadata also fails (`CleanupAfterUploadFailed`).
    pub async fn upload(&self, request: UploadRequest) -> ServiceResult<FileRecord> {
        let name = required("name", request.name)?;
        let file_type: FileType = required("type", request.file_type)?
            .parse()
            .map_err(|_| ServiceError::InvalidInput("Invalid type".into()))?;

        let payload = if file_type.has_payload() {
            let data = required("data", request.data)?;
            Some(decode_base64(&data)?)
        } else {
            None
        };

        let record = FileRecord {
            id: RecordId::new(),
            name,
            file_type,
            parent_id: request
                .parent_id
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| ROOT_PARENT_ID.to_string()),
            is_public: request.is_public.unwrap_or(false),
            user_id: request.owner_id,
        };

        self.db
            .insert_one(FILES_COLLECTION, record.to_document())
            .await?;

        if let Some(bytes) = payload {
            if let Err(upload_error) = self.write_bytes(record.id, bytes).await {
                return Err(self.compensate(record.id, upload_error).await);
            }
        }

        tracing::info!("Stored {} {} ({})", record.file_type, record.id, record.name);
        Ok(record)
    }

    async fn write_bytes(&self, id: RecordId, bytes: Vec<u8>) -> ServiceResult<()> {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || storage.write(&id, &bytes))
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))??;
        Ok(())
    }

    /// Removes the metadata of an upload whose bytes could not be written.
    async fn compensate(&self, id: RecordId, upload_error: ServiceError) -> ServiceError {
        tracing::warn!(
            "Writing bytes for {} failed, removing its metadata: {}",
            id,
            upload_error
        );

        match self
            .db
            .delete_one(FILES_COLLECTION, doc! { "_id": id.to_string() })
            .await
        {
            Ok(_) => upload_error,
            Err(cleanup_error) => {
                tracing::error!(
                    "Failed to remove metadata of {} after upload failure: {}",
                    id,
                    cleanup_error
                );
                ServiceError::CleanupAfterUploadFailed {
                    id,
                    upload_error: Box::new(upload_error),
                    cleanup_error,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DbConfig, StoreTimeouts};
    use crate::error::{BackendError, StoreError};
    use crate::testing::answering_documents;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use mongodb::bson::Bson;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn memory_store() -> DocumentStore {
        let (db, setup) = DocumentStore::in_memory(StoreTimeouts::default());
        setup.await.unwrap().unwrap();
        db
    }

    fn file_request(data: &[u8]) -> UploadRequest {
        UploadRequest {
            name: Some("hello.txt".into()),
            file_type: Some("file".into()),
            data: Some(STANDARD.encode(data)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upload_stores_metadata_and_bytes() {
        let temp = TempDir::new().unwrap();
        let db = memory_store().await;
        let service = UploadService::new(db.clone(), FilesService::new(temp.path()).unwrap());

        let mut request = file_request(b"Hello, World!");
        request.owner_id = Some("user-1".into());
        let record = service.upload(request).await.unwrap();

        assert_eq!(record.parent_id, "0");
        assert!(!record.is_public);
        assert_eq!(record.user_id.as_deref(), Some("user-1"));
        assert_eq!(service.storage().read(&record.id).unwrap(), b"Hello, World!");
        let stored = db
            .find_one("files", doc! { "_id": record.id.to_string() })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.get_str("name").unwrap(), "hello.txt");
    }

    #[tokio::test]
    async fn test_folder_needs_no_data_and_writes_no_bytes() {
        let temp = TempDir::new().unwrap();
        let db = memory_store().await;
        let service = UploadService::new(db, FilesService::new(temp.path()).unwrap());

        let record = service
            .upload(UploadRequest {
                name: Some("docs".into()),
                file_type: Some("folder".into()),
                parent_id: Some("abc".into()),
                is_public: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(record.file_type, FileType::Folder);
        assert_eq!(record.parent_id, "abc");
        assert!(record.is_public);
        assert!(!service.storage().path_for(&record.id).exists());
    }

    #[tokio::test]
    async fn test_validation_messages() {
        let temp = TempDir::new().unwrap();
        let db = memory_store().await;
        let service = UploadService::new(db.clone(), FilesService::new(temp.path()).unwrap());

        let cases = [
            (
                UploadRequest {
                    name: None,
                    ..file_request(b"x")
                },
                "Missing name",
            ),
            (
                UploadRequest {
                    file_type: None,
                    ..file_request(b"x")
                },
                "Missing type",
            ),
            (
                UploadRequest {
                    file_type: Some("video".into()),
                    ..file_request(b"x")
                },
                "Invalid type",
            ),
            (
                UploadRequest {
                    data: None,
                    ..file_request(b"x")
                },
                "Missing data",
            ),
            (
                UploadRequest {
                    data: Some("***".into()),
                    ..file_request(b"x")
                },
                "Invalid data",
            ),
        ];

        for (request, message) in cases {
            let err = service.upload(request).await.unwrap_err();
            assert!(err.is_client_error());
            assert_eq!(err.to_string(), message);
        }
        assert_eq!(db.count_files().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejected_metadata_writes_no_bytes() {
        let temp = TempDir::new().unwrap();
        let db = DocumentStore::new(DbConfig::default(), StoreTimeouts::default());
        let service = UploadService::new(db, FilesService::new(temp.path()).unwrap());

        let err = service.upload(file_request(b"bytes")).await.unwrap_err();

        assert!(matches!(err, ServiceError::Store(ref e) if e.is_not_ready()));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_byte_write_failure_removes_metadata() {
        let temp = TempDir::new().unwrap();
        let db = memory_store().await;
        let storage = FilesService::new(&temp.path().join("store")).unwrap();
        std::fs::remove_dir_all(storage.root_directory()).unwrap();
        let service = UploadService::new(db.clone(), storage);

        let err = service.upload(file_request(b"bytes")).await.unwrap_err();

        assert!(matches!(err, ServiceError::Files(_)));
        assert_eq!(db.count_files().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_compensation_reports_both_errors() {
        let temp = TempDir::new().unwrap();
        let mut mock = answering_documents();
        mock.expect_insert_one()
            .returning(|_, document| Ok(document.get("_id").cloned().unwrap_or(Bson::Null)));
        mock.expect_delete_one()
            .times(1)
            .returning(|_, _| Err(BackendError::rejected("not authorized")));
        let db = DocumentStore::new(DbConfig::default(), StoreTimeouts::default());
        db.connect_to(Arc::new(mock)).await.unwrap().unwrap();
        let storage = FilesService::new(&temp.path().join("store")).unwrap();
        std::fs::remove_dir_all(storage.root_directory()).unwrap();
        let service = UploadService::new(db, storage);

        let err = service.upload(file_request(b"bytes")).await.unwrap_err();

        match err {
            ServiceError::CleanupAfterUploadFailed {
                upload_error,
                cleanup_error,
                ..
            } => {
                assert!(matches!(*upload_error, ServiceError::Files(_)));
                assert!(matches!(cleanup_error, StoreError::Query(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
