//! # API Shared
//!
//! Wire types for the files manager HTTP API.
//!
//! Contains:
//! - Request and response bodies with their OpenAPI schemas
//! - The owner header convention used by uploads
//!
//! Used by `api-rest`. Field names follow the JSON contract (camelCase) rather than Rust naming.

pub mod auth;
pub mod health;
pub mod records;

pub use auth::{owner_from_header, USER_ID_HEADER};
pub use health::{StatsRes, StatusRes};
pub use records::{CreateUserReq, CreateUserRes, ErrorRes, FileRes, UploadFileReq};
