//! # API REST
//!
//! REST API implementation for the files manager.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI documentation (served as JSON)
//! - REST-specific concerns (JSON bodies, status codes, CORS)
//!
//! Uses `api-shared` for the wire types and `fm-core` for the services.

#![warn(rust_2018_idioms)]

use api_shared::{
    owner_from_header, CreateUserReq, CreateUserRes, ErrorRes, FileRes, StatsRes, StatusRes,
    UploadFileReq, USER_ID_HEADER,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use fm_core::{FileRecord, ServiceError, StatsService, UploadRequest, UploadService, UserService};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

/// Application state shared across REST API handlers
///
/// Holds the request-level services. Each service is a cheap clone over the shared stores.
#[derive(Clone)]
pub struct AppState {
    pub stats: StatsService,
    pub users: UserService,
    pub uploads: UploadService,
}

#[derive(OpenApi)]
#[openapi(
    paths(status, stats, create_user, upload_file),
    components(schemas(
        StatusRes,
        StatsRes,
        CreateUserReq,
        CreateUserRes,
        UploadFileReq,
        FileRes,
        ErrorRes
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with CORS and the OpenAPI document attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/stats", get(stats))
        .route("/users", post(create_user))
        .route("/files", post(upload_file))
        .route("/api-docs/openapi.json", get(openapi))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Error returned by handlers, rendered as `{"error": ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// The request itself is invalid; the message is shown to the client.
    BadRequest(String),
    /// Anything else. Details are logged, never returned.
    Internal,
}

impl ApiError {
    /// Classifies a service failure, logging infrastructure errors with `context`.
    fn from_service(context: &str, e: ServiceError) -> Self {
        if e.is_client_error() {
            ApiError::BadRequest(e.to_string())
        } else {
            tracing::error!("{} error: {:?}", context, e);
            ApiError::Internal
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into()),
        };
        (status, Json(ErrorRes { error })).into_response()
    }
}

fn file_res(record: FileRecord) -> FileRes {
    FileRes {
        id: record.id.to_string(),
        name: record.name,
        file_type: record.file_type.as_str().to_string(),
        parent_id: record.parent_id,
        is_public: record.is_public,
        user_id: record.user_id,
    }
}

#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Liveness of the document store and the cache", body = StatusRes)
    )
)]
/// Reports whether each store is currently connected
///
/// Never fails: a store that is still connecting or has failed reports `false`.
#[axum::debug_handler]
async fn status(State(state): State<AppState>) -> Json<StatusRes> {
    let status = state.stats.status();
    Json(StatusRes {
        db: status.db,
        redis: status.redis,
    })
}

#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Number of users and files", body = StatsRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Counts stored users and files
///
/// Counts are zero while the document store is still connecting.
///
/// # Errors
/// Returns `500 Internal Server Error` if:
/// - the document store has failed,
/// - a count fails or times out.
#[axum::debug_handler]
async fn stats(State(state): State<AppState>) -> Result<Json<StatsRes>, ApiError> {
    let stats = state
        .stats
        .stats()
        .await
        .map_err(|e| ApiError::from_service("Stats", e))?;
    Ok(Json(StatsRes {
        users: stats.users,
        files: stats.files,
    }))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "User created", body = CreateUserRes),
        (status = 400, description = "Missing email, missing password or already exists", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Create a new user
///
/// # Arguments
/// * `req` - Email and password; only a hash of the password is stored
///
/// # Returns
/// * `201` with the new user's id and email
///
/// # Errors
/// Returns `400 Bad Request` if a field is missing or the email is taken, and
/// `500 Internal Server Error` if the store is unavailable.
#[axum::debug_handler]
async fn create_user(
    State(state): State<AppState>,
    req: Result<Json<CreateUserReq>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateUserRes>), ApiError> {
    let Json(req) = req?;
    let user = state
        .users
        .create_user(req.email, req.password)
        .await
        .map_err(|e| ApiError::from_service("Create user", e))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateUserRes {
            id: user.id,
            email: user.email,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/files",
    request_body = UploadFileReq,
    params(
        ("x-user-id" = Option<String>, Header, description = "Owner of the upload")
    ),
    responses(
        (status = 201, description = "File stored", body = FileRes),
        (status = 400, description = "Invalid upload", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Upload a file, image or folder
///
/// Stores the metadata record and, unless the upload is a folder, the decoded bytes under
/// the storage root keyed by the new id.
///
/// # Errors
/// Returns `400 Bad Request` for missing or invalid fields and `500 Internal Server Error`
/// if the metadata or the bytes cannot be stored.
#[axum::debug_handler]
async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: Result<Json<UploadFileReq>, JsonRejection>,
) -> Result<(StatusCode, Json<FileRes>), ApiError> {
    let Json(req) = req?;
    let owner_id = owner_from_header(
        headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok()),
    );

    let record = state
        .uploads
        .upload(UploadRequest {
            name: req.name,
            file_type: req.file_type,
            parent_id: req.parent_id,
            is_public: req.is_public,
            data: req.data,
            owner_id,
        })
        .await
        .map_err(|e| ApiError::from_service("Upload", e))?;

    Ok((StatusCode::CREATED, Json(file_res(record))))
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
