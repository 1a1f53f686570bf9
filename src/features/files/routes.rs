use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::files::dtos::MULTIPART_OVERHEAD;
use crate::features::files::handlers::{delete_files, index, list_files, upload_file};
use crate::features::files::services::FileService;

/// Create routes for the files feature
pub fn routes(file_service: Arc<FileService>) -> Router {
    let body_limit = file_service.max_upload_size() + MULTIPART_OVERHEAD;

    Router::new()
        .route("/", get(index))
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/delete-files", post(delete_files))
        .route("/api/files", get(list_files))
        .with_state(file_service)
}
