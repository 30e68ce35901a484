//! Document store access.
//!
//! [`DocumentStore`] owns the document database connection and exposes the small query
//! surface the services rely on. The store is constructed disconnected and never blocks an
//! operation waiting for the connection: callers either get an answer, a `NotReady` error
//! or a `Connection` error once the store has failed.

use crate::backends::mongo::MongoBackend;
use crate::backends::memory::MemoryDocuments;
use crate::config::{DbConfig, StoreTimeouts};
use crate::connection::{ConnectionCell, ConnectionState, Probe};
use crate::constants::{DOCUMENT_STORE_NAME, FILES_COLLECTION, USERS_COLLECTION};
use crate::error::{BackendError, BackendErrorKind, InsertionFailure, StoreError, StoreResult};
use crate::models::User;
use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Operations a document database must provide.
///
/// Implementations classify their failures with [`BackendErrorKind`]: a `Transport` error
/// marks the store as failed, `AlreadyExists` and `DuplicateKey` are interpreted by the store,
/// and anything else is reported as a rejected request.
#[async_trait]
pub trait DocumentBackend: Probe {
    async fn list_collections(&self) -> Result<Vec<String>, BackendError>;

    async fn create_collection(&self, name: &str) -> Result<(), BackendError>;

    async fn count_documents(&self, collection: &str, filter: Document)
        -> Result<u64, BackendError>;

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, BackendError>;

    /// Inserts `document` and returns the id it was stored under.
    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson, BackendError>;

    /// Deletes the first document matching `filter` and returns how many were deleted.
    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64, BackendError>;
}

/// Shared handle to the document database.
///
/// Cloning is cheap; all clones observe the same connection.
#[derive(Clone)]
pub struct DocumentStore {
    cell: Arc<ConnectionCell<dyn DocumentBackend>>,
    config: DbConfig,
}

impl DocumentStore {
    /// Creates a disconnected store. Nothing is contacted until [`DocumentStore::connect`].
    pub fn new(config: DbConfig, timeouts: StoreTimeouts) -> Self {
        Self {
            cell: ConnectionCell::new(DOCUMENT_STORE_NAME, timeouts),
            config,
        }
    }

    /// Starts connecting to the MongoDB server named by the configuration.
    ///
    /// Returns immediately. Progress is observable through [`DocumentStore::is_alive`] and
    /// [`DocumentStore::ready`]; the returned task resolves to the outcome of setup and may be
    /// dropped.
    pub fn connect(&self) -> JoinHandle<StoreResult<()>> {
        let uri = self.config.uri();
        let database = self.config.database.clone();
        tracing::info!(
            "Connecting to {} at {}:{}",
            DOCUMENT_STORE_NAME,
            self.config.host,
            self.config.port
        );
        self.connect_with(move || {
            let uri = uri.clone();
            let database = database.clone();
            async move {
                let backend = MongoBackend::connect(&uri, &database).await?;
                Ok(Arc::new(backend) as Arc<dyn DocumentBackend>)
            }
        })
    }

    /// Starts connecting with a caller-provided backend factory.
    ///
    /// The factory is called once per attempt, so a failed setup can be retried.
    pub fn connect_with<C, F>(&self, connector: C) -> JoinHandle<StoreResult<()>>
    where
        C: Fn() -> F + Send + Sync + 'static,
        F: Future<Output = Result<Arc<dyn DocumentBackend>, BackendError>> + Send + 'static,
    {
        self.cell.connect(connector)
    }

    /// Starts connecting to an already constructed backend.
    pub fn connect_to(&self, backend: Arc<dyn DocumentBackend>) -> JoinHandle<StoreResult<()>> {
        self.connect_with(move || std::future::ready(Ok(Arc::clone(&backend))))
    }

    /// Connected to a fresh in-memory backend.
    pub fn in_memory(timeouts: StoreTimeouts) -> (Self, JoinHandle<StoreResult<()>>) {
        let store = Self::new(DbConfig::default(), timeouts);
        let setup = store.connect_to(Arc::new(MemoryDocuments::new()));
        (store, setup)
    }

    /// Resolves once connection setup has finished.
    ///
    /// # Errors
    ///
    /// Returns the setup failure if the store could not connect.
    pub async fn ready(&self) -> StoreResult<()> {
        self.cell.ready().await
    }

    /// True iff setup completed and no failure has been observed since.
    pub fn is_alive(&self) -> bool {
        self.cell.is_alive()
    }

    pub fn state(&self) -> ConnectionState {
        self.cell.state()
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Names of the collections that currently exist.
    pub async fn list_collections(&self) -> StoreResult<Vec<String>> {
        self.cell
            .run("list_collections", |db| async move { db.list_collections().await })
            .await?
            .map_err(query_error)
    }

    /// Makes sure every collection in `names` exists.
    ///
    /// Names are de-duplicated, only the missing ones are created, and an "already exists"
    /// answer from a concurrent creator counts as success. Safe to call repeatedly.
    ///
    /// # Returns
    ///
    /// The names this call actually created.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store is not ready or a listing or creation fails for any
    /// reason other than the collection already existing.
    pub async fn ensure_collections<I, S>(&self, names: I) -> StoreResult<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted: BTreeSet<String> = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        let existing: BTreeSet<String> = self.list_collections().await?.into_iter().collect();

        let mut created = Vec::new();
        for name in wanted.difference(&existing) {
            let outcome = self
                .cell
                .run("create_collection", |db| async move {
                    db.create_collection(name).await
                })
                .await?;

            match outcome {
                Ok(()) => {
                    tracing::info!("Created collection {}", name);
                    created.push(name.clone());
                }
                Err(e) if e.kind() == BackendErrorKind::AlreadyExists => {
                    tracing::debug!("Collection {} was created concurrently", name);
                }
                Err(e) => return Err(query_error(e)),
            }
        }

        Ok(created)
    }

    /// Number of documents in `collection`, reporting zero while the store is not ready.
    ///
    /// # Errors
    ///
    /// Failures other than not-ready (a failed connection, a timeout, a rejected query) are
    /// still returned.
    pub async fn count_documents(&self, collection: &str) -> StoreResult<u64> {
        match self.try_count_documents(collection).await {
            Err(StoreError::NotReady(_)) => Ok(0),
            other => other,
        }
    }

    /// Number of documents in `collection`, failing with `StoreError::NotReady` before setup
    /// completes.
    pub async fn try_count_documents(&self, collection: &str) -> StoreResult<u64> {
        self.cell
            .run("count_documents", |db| async move {
                db.count_documents(collection, Document::new()).await
            })
            .await?
            .map_err(query_error)
    }

    /// First document in `collection` matching `filter`, or `None`.
    pub async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>> {
        self.cell
            .run("find_one", |db| async move { db.find_one(collection, filter).await })
            .await?
            .map_err(query_error)
    }

    /// Inserts `document` into `collection` and returns the id it was stored under.
    ///
    /// # Errors
    ///
    /// Always `StoreError::Insertion` except for a timeout; the [`InsertionFailure`] tells
    /// whether the store was not ready, the key was a duplicate, the write was rejected or the
    /// transport broke.
    pub async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<String> {
        let outcome = self
            .cell
            .run("insert_one", |db| async move {
                db.insert_one(collection, document).await
            })
            .await
            .map_err(|e| match e {
                StoreError::NotReady(_) => StoreError::Insertion(InsertionFailure::NotReady),
                StoreError::Connection { reason, .. } => {
                    StoreError::Insertion(InsertionFailure::Transport(reason))
                }
                other => other,
            })?;

        match outcome {
            Ok(id) => Ok(crate::backends::id_to_string(&id)),
            Err(e) => Err(StoreError::Insertion(match e.kind() {
                BackendErrorKind::DuplicateKey => InsertionFailure::DuplicateKey(e.to_string()),
                BackendErrorKind::Transport => InsertionFailure::Transport(e.to_string()),
                BackendErrorKind::AlreadyExists | BackendErrorKind::Rejected => {
                    InsertionFailure::Rejected(e.to_string())
                }
            })),
        }
    }

    /// Deletes the first document in `collection` matching `filter`.
    ///
    /// # Returns
    ///
    /// `true` if a document was deleted.
    pub async fn delete_one(&self, collection: &str, filter: Document) -> StoreResult<bool> {
        self.cell
            .run("delete_one", |db| async move {
                db.delete_one(collection, filter).await
            })
            .await?
            .map(|deleted| deleted > 0)
            .map_err(query_error)
    }

    /// Handle to one collection of this store.
    pub fn collection(&self, name: impl Into<String>) -> Collection {
        Collection {
            store: self.clone(),
            name: name.into(),
        }
    }

    pub fn users(&self) -> Collection {
        self.collection(USERS_COLLECTION)
    }

    pub fn files(&self) -> Collection {
        self.collection(FILES_COLLECTION)
    }

    pub async fn count_users(&self) -> StoreResult<u64> {
        self.count_documents(USERS_COLLECTION).await
    }

    pub async fn count_files(&self) -> StoreResult<u64> {
        self.count_documents(FILES_COLLECTION).await
    }

    /// Looks up a user by email.
    pub async fn find_user(&self, email: &str) -> StoreResult<Option<User>> {
        self.find_one(USERS_COLLECTION, doc! { "email": email })
            .await?
            .map(|document| User::from_document(&document).map_err(StoreError::Query))
            .transpose()
    }

    /// Stores a new user record and returns its id. `password_hash` is stored as given.
    pub async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<String> {
        self.insert_one(
            USERS_COLLECTION,
            doc! { "email": email, "password": password_hash },
        )
        .await
    }
}

/// A collection bound to its store.
#[derive(Clone)]
pub struct Collection {
    store: DocumentStore,
    name: String,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn count_documents(&self) -> StoreResult<u64> {
        self.store.count_documents(&self.name).await
    }

    pub async fn find_one(&self, filter: Document) -> StoreResult<Option<Document>> {
        self.store.find_one(&self.name, filter).await
    }

    pub async fn insert_one(&self, document: Document) -> StoreResult<String> {
        self.store.insert_one(&self.name, document).await
    }

    pub async fn delete_one(&self, filter: Document) -> StoreResult<bool> {
        self.store.delete_one(&self.name, filter).await
    }
}

fn query_error(e: BackendError) -> StoreError {
    StoreError::Query(e.to_string())
}
