pub mod admin;
pub mod search;
pub mod server;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use project_search::error::AppError;

/// Error body shared by every handler / 统一错误响应
#[derive(Debug)]
pub enum ApiError {
    App(AppError),
    /// Request rejected before reaching a component
    BadRequest(String),
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self::App(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": "ValidationError", "detail": detail }),
            ),
            Self::App(error) if !error.is_user_error() => {
                tracing::error!("Request failed: {:?}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "error": error.kind(), "detail": "Internal server error" }),
                )
            }
            Self::App(error) => {
                let status = match error {
                    AppError::InvalidDataset(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::BAD_REQUEST,
                };
                let mut body = json!({
                    "success": false,
                    "error": error.kind(),
                    "detail": error.to_string(),
                });
                if let Some(columns) = error.available_columns() {
                    body["availableColumns"] = json!(columns);
                }
                (status, body)
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// All routes under /api / 路由表
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.ingest.max_upload_mb * 1024 * 1024;

    Router::new()
        .route("/api/health", get(server::health_check))
        .route("/api/years", get(search::query::years))
        .route("/api/search/", get(search::query::search))
        .route("/api/suggestions/", get(search::query::suggestions))
        .route("/api/admin/upload-excel", post(admin::upload::upload_excel))
        .route("/api/admin/tables", get(admin::tables::list_tables))
        .route(
            "/api/admin/tables/:name",
            get(admin::tables::list_rows).post(admin::tables::insert_row),
        )
        .route(
            "/api/admin/tables/:name/:group_no",
            put(admin::tables::update_row).delete(admin::tables::delete_row),
        )
        .route("/api/admin/tables/:name/reindex", post(admin::tables::reindex))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
