use fm_uuid::RecordId;
use std::time::Duration;

/// Classification a backend attaches to a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// The connection to the server is broken or unreachable.
    Transport,
    /// A collection being created already exists.
    AlreadyExists,
    /// A write violated a unique key.
    DuplicateKey,
    /// The server understood the request and refused it.
    Rejected,
}

/// Error reported by a [`crate::db::DocumentBackend`] or [`crate::cache::CacheBackend`].
///
/// Backends translate their client library errors into this type so the stores can decide
/// what a failure means for the connection state without knowing the library.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    kind: BackendErrorKind,
    message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Transport, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::AlreadyExists, message)
    }

    pub fn duplicate_key(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::DuplicateKey, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Rejected, message)
    }

    pub fn kind(&self) -> BackendErrorKind {
        self.kind
    }

    pub fn is_transport(&self) -> bool {
        self.kind == BackendErrorKind::Transport
    }
}

/// Why an `insert_one` did not persist its document.
#[derive(Debug, thiserror::Error)]
pub enum InsertionFailure {
    #[error("document store is not ready")]
    NotReady,
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    #[error("write rejected: {0}")]
    Rejected(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Errors raised by the persistence access layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{store} connection error: {reason}")]
    Connection { store: &'static str, reason: String },
    #[error("{0} is not ready")]
    NotReady(&'static str),
    #[error("insertion failed: {0}")]
    Insertion(InsertionFailure),
    #[error("document store query failed: {0}")]
    Query(String),
    #[error("cache error: {0}")]
    Cache(String),
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl StoreError {
    /// True when the store simply has not finished connecting yet.
    pub fn is_not_ready(&self) -> bool {
        matches!(
            self,
            StoreError::NotReady(_) | StoreError::Insertion(InsertionFailure::NotReady)
        )
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by the request-level services.
///
/// The `Display` text of the validation variants is the message returned to clients.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Missing {0}")]
    MissingField(&'static str),
    #[error("Already exist")]
    Duplicate,
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("file storage error: {0}")]
    Files(#[from] fm_files::FilesError),
    #[error(
        "upload of {id} failed and removing its metadata also failed: upload={upload_error}; cleanup={cleanup_error}"
    )]
    CleanupAfterUploadFailed {
        id: RecordId,
        #[source]
        upload_error: Box<ServiceError>,
        cleanup_error: StoreError,
    },
    #[error("background task failed: {0}")]
    Task(String),
}

impl ServiceError {
    /// True for failures caused by the request itself rather than the infrastructure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::MissingField(_) | ServiceError::Duplicate | ServiceError::InvalidInput(_)
        )
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Errors raised while resolving configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}
