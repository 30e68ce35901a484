//! MongoDB document backend.

use crate::connection::Probe;
use crate::db::DocumentBackend;
use crate::error::BackendError;
use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{Error, ErrorKind, WriteFailure};
use mongodb::{Client, Database};

/// Server code for "collection already exists" (NamespaceExists).
const NAMESPACE_EXISTS: i32 = 48;

/// Server code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

pub struct MongoBackend {
    database: Database,
}

impl MongoBackend {
    /// Builds a client for `uri` and selects `database`.
    ///
    /// The driver connects lazily; the store's liveness probe performs the first round trip.
    ///
    /// # Errors
    ///
    /// Returns a transport `BackendError` if the connection string cannot be parsed or the
    /// client cannot be built.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, BackendError> {
        let client = Client::with_uri_str(uri).await.map_err(classify)?;
        Ok(Self {
            database: client.database(database),
        })
    }
}

#[async_trait]
impl Probe for MongoBackend {
    async fn ping(&self) -> Result<(), BackendError> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(classify)
    }
}

#[async_trait]
impl DocumentBackend for MongoBackend {
    async fn list_collections(&self) -> Result<Vec<String>, BackendError> {
        self.database
            .list_collection_names()
            .await
            .map_err(classify)
    }

    async fn create_collection(&self, name: &str) -> Result<(), BackendError> {
        self.database
            .create_collection(name)
            .await
            .map_err(classify)
    }

    async fn count_documents(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<u64, BackendError> {
        self.database
            .collection::<Document>(collection)
            .count_documents(filter)
            .await
            .map_err(classify)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, BackendError> {
        self.database
            .collection::<Document>(collection)
            .find_one(filter)
            .await
            .map_err(classify)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson, BackendError> {
        self.database
            .collection::<Document>(collection)
            .insert_one(document)
            .await
            .map(|result| result.inserted_id)
            .map_err(classify)
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64, BackendError> {
        self.database
            .collection::<Document>(collection)
            .delete_one(filter)
            .await
            .map(|result| result.deleted_count)
            .map_err(classify)
    }
}

fn classify(err: Error) -> BackendError {
    let message = err.to_string();
    match &*err.kind {
        ErrorKind::Command(command) if command.code == NAMESPACE_EXISTS => {
            BackendError::already_exists(message)
        }
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => {
            BackendError::duplicate_key(message)
        }
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. } => BackendError::transport(message),
        _ => BackendError::rejected(message),
    }
}
