//! Mock backends shared by the unit tests.

use crate::connection::Probe;
use crate::db::DocumentBackend;
use crate::error::BackendError;
use async_trait::async_trait;
use mockall::mock;
use mongodb::bson::{Bson, Document};

mock! {
    pub Documents {}

    #[async_trait]
    impl Probe for Documents {
        async fn ping(&self) -> Result<(), BackendError>;
    }

    #[async_trait]
    impl DocumentBackend for Documents {
        async fn list_collections(&self) -> Result<Vec<String>, BackendError>;
        async fn create_collection(&self, name: &str) -> Result<(), BackendError>;
        async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64, BackendError>;
        async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>, BackendError>;
        async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson, BackendError>;
        async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64, BackendError>;
    }
}

/// A document backend mock whose liveness probe always answers.
pub(crate) fn answering_documents() -> MockDocuments {
    let mut mock = MockDocuments::new();
    mock.expect_ping().returning(|| Ok(()));
    mock
}
