//! Records persisted by the services.

use crate::constants::ROOT_PARENT_ID;
use fm_uuid::RecordId;
use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of an uploaded record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    File,
    Folder,
    Image,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::File => "file",
            FileType::Folder => "folder",
            FileType::Image => "image",
        }
    }

    /// Folders are metadata only; files and images carry bytes.
    pub fn has_payload(&self) -> bool {
        !matches!(self, FileType::Folder)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(FileType::File),
            "folder" => Ok(FileType::Folder),
            "image" => Ok(FileType::Image),
            other => Err(format!("unknown file type '{}'", other)),
        }
    }
}

/// Metadata of one uploaded file or folder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: RecordId,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub parent_id: String,
    pub is_public: bool,
    pub user_id: Option<String>,
}

impl FileRecord {
    pub fn new(name: impl Into<String>, file_type: FileType) -> Self {
        Self {
            id: RecordId::new(),
            name: name.into(),
            file_type,
            parent_id: ROOT_PARENT_ID.to_string(),
            is_public: false,
            user_id: None,
        }
    }

    /// Document stored in the `files` collection, keyed by the record id.
    pub fn to_document(&self) -> Document {
        let mut document = doc! {
            "_id": self.id.to_string(),
            "name": self.name.as_str(),
            "type": self.file_type.as_str(),
            "parentId": self.parent_id.as_str(),
            "isPublic": self.is_public,
        };
        if let Some(user_id) = &self.user_id {
            document.insert("userId", user_id.as_str());
        }
        document
    }
}

/// A stored user account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
}

impl User {
    /// Reads a user from its `users` collection document.
    ///
    /// # Errors
    ///
    /// Returns a description of the first missing or mistyped field.
    pub fn from_document(document: &Document) -> Result<Self, String> {
        let id = match document.get("_id") {
            Some(id) => crate::backends::id_to_string(id),
            None => return Err("user document has no _id".into()),
        };
        let email = document
            .get_str("email")
            .map_err(|e| format!("user {}: email: {}", id, e))?
            .to_string();
        let password_hash = document
            .get_str("password")
            .map_err(|e| format!("user {}: password: {}", id, e))?
            .to_string();

        Ok(Self {
            id,
            email,
            password_hash,
        })
    }
}

/// What a successful signup returns. Never carries the password hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CreatedUser {
    pub id: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_parsing() {
        assert_eq!("image".parse::<FileType>().unwrap(), FileType::Image);
        assert!("Folder".parse::<FileType>().is_err());
        assert!(!FileType::Folder.has_payload());
        assert!(FileType::File.has_payload());
    }

    #[test]
    fn test_file_record_document_layout() {
        let mut record = FileRecord::new("notes.txt", FileType::File);
        record.user_id = Some("u1".into());

        let document = record.to_document();

        assert_eq!(document.get_str("_id").unwrap(), record.id.to_string());
        assert_eq!(document.get_str("type").unwrap(), "file");
        assert_eq!(document.get_str("parentId").unwrap(), "0");
        assert!(!document.get_bool("isPublic").unwrap());
        assert_eq!(document.get_str("userId").unwrap(), "u1");
    }

    #[test]
    fn test_file_record_json_uses_camel_case() {
        let record = FileRecord::new("docs", FileType::Folder);

        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["type"], "folder");
        assert_eq!(json["parentId"], "0");
        assert_eq!(json["isPublic"], false);
        assert!(json["userId"].is_null());
    }

    #[test]
    fn test_user_from_document_requires_fields() {
        let complete = doc! { "_id": "id1", "email": "a@b.com", "password": "h" };
        let partial = doc! { "_id": "id2", "email": "a@b.com" };

        assert_eq!(User::from_document(&complete).unwrap().email, "a@b.com");
        assert!(User::from_document(&partial).is_err());
    }
}
