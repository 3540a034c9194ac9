//! HTTP surface of the daemon.
//!
//! An axum router under `/api` maps each endpoint onto one component:
//! the mod store, the file tree, the status probe and the lifecycle
//! controller. Handlers return `Result<_, ApiError>`; the `From` impls
//! below translate each component's error enum into a status code plus a
//! `{"error": message}` body, so no internal error ever crashes the
//! process. The status endpoint is the one exception to error mapping:
//! probe failures are ordinary data and always come back as 200.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::files::{FileTree, TreeError};
use crate::lifecycle::{DockerCli, LifecycleController, LifecycleError};
use crate::mods::{ModError, ModStore};
use crate::probe::StatusProbe;

/// Maximum number of files accepted in one multipart upload.
pub const MAX_UPLOAD_FILES: usize = 20;

/// The components handlers operate on, built once from the configuration.
pub struct AppState {
    pub mods: ModStore,
    pub files: FileTree,
    pub probe: StatusProbe,
    pub lifecycle: LifecycleController<DockerCli>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Arc<Self> {
        Arc::new(Self {
            mods: ModStore::new(config.paths.mods_dir.clone()),
            files: FileTree::new(&config.paths.files_dir),
            probe: StatusProbe::new(
                config.server.host.clone(),
                config.server.port,
                std::time::Duration::from_secs(config.server.status_timeout_secs),
            ),
            lifecycle: LifecycleController::from_config(&config.runtime),
        })
    }
}

/// An error ready to leave the service: a status code and a message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("request failed: {}", self.message);
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<TreeError> for ApiError {
    fn from(err: TreeError) -> Self {
        let status = match &err {
            TreeError::NotFound(_) => StatusCode::NOT_FOUND,
            TreeError::AlreadyExists(_) => StatusCode::CONFLICT,
            TreeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<ModError> for ApiError {
    fn from(err: ModError) -> Self {
        let status = match &err {
            ModError::NotFound(_) => StatusCode::NOT_FOUND,
            ModError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        let status = match &err {
            LifecycleError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

/// Build the `/api` router over shared state.
pub fn build_router(state: Arc<AppState>, max_body_size: usize) -> Router {
    Router::new()
        .route("/api/health", get(handle_health))
        .route("/api/status", get(handle_status))
        .route("/api/restart", post(handle_restart))
        .route("/api/mods", get(handle_mods_list).post(handle_mods_upload))
        .route("/api/mods/{name}", delete(handle_mods_delete))
        .route("/api/mods/{name}/toggle", patch(handle_mods_toggle))
        .route(
            "/api/files",
            get(handle_files_list).delete(handle_files_delete),
        )
        .route("/api/files/read", get(handle_files_read))
        .route("/api/files/write", put(handle_files_write))
        .route("/api/files/create", post(handle_files_create))
        .route("/api/files/mkdir", post(handle_files_mkdir))
        .route("/api/files/rename", post(handle_files_rename))
        .route("/api/files/upload", post(handle_files_upload))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_size))
}

/// Drain a multipart stream, keeping fields named `field_name`.
///
/// Unknown fields are ignored; a batch over [`MAX_UPLOAD_FILES`] or with no
/// matching files at all is a 400.
async fn collect_upload(
    mut multipart: Multipart,
    field_name: &str,
) -> Result<Vec<(String, Bytes)>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(format!("malformed multipart body: {err}")))?
    {
        if field.name() != Some(field_name) {
            continue;
        }
        let name = field
            .file_name()
            .map(str::to_owned)
            .ok_or_else(|| ApiError::bad_request("multipart file field carries no filename"))?;
        let data = field
            .bytes()
            .await
            .map_err(|err| ApiError::bad_request(format!("failed to read upload: {err}")))?;
        files.push((name, data));
        if files.len() > MAX_UPLOAD_FILES {
            return Err(ApiError::bad_request(format!(
                "too many files in one upload (limit: {MAX_UPLOAD_FILES})"
            )));
        }
    }
    if files.is_empty() {
        return Err(ApiError::bad_request("no files uploaded"));
    }
    Ok(files)
}

#[derive(Debug, Deserialize)]
struct PathQuery {
    #[serde(default)]
    path: String,
}

#[derive(Debug, Deserialize)]
struct WriteRequest {
    path: String,
    /// Absent content means an empty file, not an error.
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct PathRequest {
    path: String,
}

#[derive(Debug, Deserialize)]
struct RenameRequest {
    #[serde(rename = "oldPath")]
    old_path: String,
    #[serde(rename = "newPath")]
    new_path: String,
}

async fn handle_health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Always 200; an unreachable server is carried in the snapshot body.
async fn handle_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.probe.probe().await)
}

async fn handle_restart(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let unit = state.lifecycle.restart().await?;
    Ok(Json(json!({
        "message": format!("restart issued to unit {unit}")
    })))
}

async fn handle_mods_list(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.mods.list()?))
}

async fn handle_mods_upload(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let files = collect_upload(multipart, "mod").await?;
    let count = state.mods.upload(&files)?;
    Ok(Json(json!({
        "message": format!("uploaded {count} mod(s)")
    })))
}

async fn handle_mods_delete(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.mods.delete(&name)?;
    Ok(Json(json!({ "message": format!("deleted {name}") })))
}

async fn handle_mods_toggle(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.mods.toggle(&name)?;
    Ok(Json(json!({
        "message": format!(
            "{} is now {}",
            outcome.name,
            if outcome.enabled { "enabled" } else { "disabled" }
        )
    })))
}

async fn handle_files_list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.files.list(&query.path)?))
}

async fn handle_files_read(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.files.read(&query.path)?))
}

async fn handle_files_write(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WriteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.files.write(&request.path, &request.content)?;
    Ok(Json(json!({ "message": format!("wrote {}", request.path) })))
}

async fn handle_files_create(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PathRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.files.create_file(&request.path)?;
    Ok(Json(json!({ "message": format!("created {}", request.path) })))
}

async fn handle_files_mkdir(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PathRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.files.create_dir(&request.path)?;
    Ok(Json(json!({
        "message": format!("created directory {}", request.path)
    })))
}

async fn handle_files_rename(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RenameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.files.rename(&request.old_path, &request.new_path)?;
    Ok(Json(json!({
        "message": format!("renamed {} to {}", request.old_path, request.new_path)
    })))
}

async fn handle_files_delete(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state.files.delete(&query.path)?;
    Ok(Json(json!({ "message": format!("deleted {}", query.path) })))
}

async fn handle_files_upload(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let files = collect_upload(multipart, "file").await?;
    let count = state.files.upload(&query.path, &files)?;
    Ok(Json(json!({
        "message": format!("uploaded {count} file(s)")
    })))
}
