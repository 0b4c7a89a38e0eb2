//! Router definitions for the `/api/v1/ftp` endpoints.

use super::{handlers, AppState};
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/v1/ftp/upload", post(handlers::upload))
        .route("/api/v1/ftp/download", get(handlers::download))
        .route("/api/v1/ftp/downloadbyte", get(handlers::download_bytes))
        .route(
            "/api/v1/ftp/listDirectories",
            get(handlers::list_directories),
        )
        .route("/api/v1/ftp/files", get(handlers::list_files))
        .route("/api/v1/ftp/newDir", get(handlers::make_directory))
        .route("/api/v1/ftp/changeDir", get(handlers::change_directory))
        .route("/api/v1/ftp/isExist", get(handlers::path_exists))
        .route("/api/v1/ftp", delete(handlers::delete_file))
        .route("/api/v1/ftp/", delete(handlers::delete_file))
        // Upload size is bounded by the caller, not the gateway.
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
