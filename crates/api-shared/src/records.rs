use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Signup request. Both fields are required; they are optional here so a missing field is
/// reported as `Missing <field>` instead of a deserialisation error.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct CreateUserReq {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Created user. The password hash is never returned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRes {
    pub id: String,
    pub email: String,
}

/// Upload request
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileReq {
    pub name: Option<String>,
    /// One of `file`, `folder`, `image`
    #[serde(rename = "type")]
    pub file_type: Option<String>,
    /// Defaults to `"0"` (root)
    pub parent_id: Option<String>,
    /// Defaults to `false`
    pub is_public: Option<bool>,
    /// Base64 payload; required unless `type` is `folder`
    pub data: Option<String>,
}

/// Stored file metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileRes {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub parent_id: String,
    pub is_public: bool,
    pub user_id: Option<String>,
}

/// Error body returned with every 4xx and 5xx response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_request_accepts_camel_case() {
        let req: UploadFileReq = serde_json::from_str(
            r#"{"name":"a.txt","type":"file","parentId":"p1","isPublic":true,"data":"eA=="}"#,
        )
        .unwrap();

        assert_eq!(req.file_type.as_deref(), Some("file"));
        assert_eq!(req.parent_id.as_deref(), Some("p1"));
        assert_eq!(req.is_public, Some(true));
    }

    #[test]
    fn test_create_user_request_tolerates_missing_fields() {
        let req: CreateUserReq = serde_json::from_str(r#"{"password":"x"}"#).unwrap();

        assert!(req.email.is_none());
        assert_eq!(req.password.as_deref(), Some("x"));
    }
}
