//! User signup.

use crate::db::DocumentStore;
use crate::error::{InsertionFailure, ServiceError, ServiceResult, StoreError};
use crate::models::CreatedUser;
use crate::validation::{present, required};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// One-way transform applied to passwords before they are stored.
#[cfg_attr(test, mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> String;
}

/// Hex-encoded SHA-256 digest of the password.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256PasswordHasher;

impl PasswordHasher for Sha256PasswordHasher {
    fn hash(&self, password: &str) -> String {
        hex::encode(Sha256::digest(password.as_bytes()))
    }
}

#[derive(Clone)]
pub struct UserService {
    db: DocumentStore,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    pub fn new(db: DocumentStore) -> Self {
        Self::with_hasher(db, Arc::new(Sha256PasswordHasher))
    }

    pub fn with_hasher(db: DocumentStore, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { db, hasher }
    }

    /// Creates a user account.
    ///
    /// # Arguments
    ///
    /// * `email` - Required; must not belong to an existing user.
    /// * `password` - Required and non-empty; hashed exactly as given, whitespace included.
    ///
    /// # Returns
    ///
    /// The new user's id and email.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` if:
    /// - either field is missing (`MissingField`), checked before any store access,
    /// - the email is already registered (`Duplicate`),
    /// - the store is not ready or fails (`Store`).
    pub async fn create_user(
        &self,
        email: Option<String>,
        password: Option<String>,
    ) -> ServiceResult<CreatedUser> {
        let email = required("email", email)?;
        let password = present("password", password)?;

        if self.db.find_user(&email).await?.is_some() {
            return Err(ServiceError::Duplicate);
        }

        let password_hash = self.hasher.hash(&password);
        let id = match self.db.create_user(&email, &password_hash).await {
            Ok(id) => id,
            // A unique index on email turns the lookup/insert race into this error.
            Err(StoreError::Insertion(InsertionFailure::DuplicateKey(_))) => {
                return Err(ServiceError::Duplicate);
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!("Created user {}", id);
        Ok(CreatedUser { id, email })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DbConfig, StoreTimeouts};

    async fn memory_store() -> DocumentStore {
        let (db, setup) = DocumentStore::in_memory(StoreTimeouts::default());
        setup.await.unwrap().unwrap();
        db
    }

    #[test]
    fn test_sha256_hasher_is_hex_digest() {
        let hash = Sha256PasswordHasher.hash("x");

        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "2d711642b726b04401627ca9fbac32f5c8530fb1903cc4db02258717921a4881"
        );
    }

    #[tokio::test]
    async fn test_create_then_duplicate() {
        let db = memory_store().await;
        let service = UserService::new(db.clone());

        let created = service
            .create_user(Some("a@b.com".into()), Some("x".into()))
            .await
            .unwrap();
        let again = service
            .create_user(Some("a@b.com".into()), Some("y".into()))
            .await;

        assert_eq!(created.email, "a@b.com");
        assert!(!created.id.is_empty());
        assert!(matches!(again, Err(ServiceError::Duplicate)));
        assert_eq!(db.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_password_is_stored_hashed() {
        let db = memory_store().await;
        let mut hasher = MockPasswordHasher::new();
        hasher
            .expect_hash()
            .withf(|password| password.to_string() == "secret")
            .times(1)
            .returning(|_| "hashed".to_string());
        let service = UserService::with_hasher(db.clone(), Arc::new(hasher));

        service
            .create_user(Some("a@b.com".into()), Some("secret".into()))
            .await
            .unwrap();

        let stored = db.find_user("a@b.com").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "hashed");
    }

    #[tokio::test]
    async fn test_password_is_hashed_untrimmed() {
        let db = memory_store().await;
        let service = UserService::new(db.clone());

        service
            .create_user(Some("a@b.com".into()), Some("  secret  ".into()))
            .await
            .unwrap();

        let stored = db.find_user("a@b.com").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, Sha256PasswordHasher.hash("  secret  "));
        assert_ne!(stored.password_hash, Sha256PasswordHasher.hash("secret"));
    }

    #[tokio::test]
    async fn test_whitespace_password_is_accepted() {
        let db = memory_store().await;
        let service = UserService::new(db);

        let created = service
            .create_user(Some("a@b.com".into()), Some("   ".into()))
            .await;
        let empty = service
            .create_user(Some("c@d.com".into()), Some(String::new()))
            .await;

        assert!(created.is_ok());
        assert_eq!(empty.unwrap_err().to_string(), "Missing password");
    }

    #[tokio::test]
    async fn test_missing_email_has_no_side_effect() {
        let db = DocumentStore::new(DbConfig::default(), StoreTimeouts::default());
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_hash().never();
        let service = UserService::with_hasher(db, Arc::new(hasher));

        let missing_email = service.create_user(None, Some("x".into())).await;
        let missing_password = service.create_user(Some("a@b.com".into()), None).await;

        assert_eq!(missing_email.unwrap_err().to_string(), "Missing email");
        assert_eq!(missing_password.unwrap_err().to_string(), "Missing password");
    }

    #[tokio::test]
    async fn test_store_not_ready_is_not_a_client_error() {
        let db = DocumentStore::new(DbConfig::default(), StoreTimeouts::default());
        let service = UserService::new(db);

        let err = service
            .create_user(Some("a@b.com".into()), Some("x".into()))
            .await
            .unwrap_err();

        assert!(!err.is_client_error());
    }
}
