use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::api::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub dataset: String,
    pub rows_imported: usize,
    pub index_built: bool,
    pub message: String,
    pub warnings: Vec<String>,
}

/// POST /api/admin/upload-excel - 上传表格并替换数据集
///
/// Multipart fields: `new_table` (dataset name) and `file` (csv or workbook).
pub async fn upload_excel(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    let mut table: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("new_table") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid table name field: {}", e)))?;
                table = Some(text);
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload.xlsx").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("File read error: {}", e)))?;
                file = Some((file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let table = table
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing new_table".to_string()))?;
    let (file_name, bytes) = file.ok_or_else(|| ApiError::BadRequest("Missing file".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }

    tracing::info!("Upload for dataset {}: {} ({} bytes)", table, file_name, bytes.len());
    let report = state.ingest.ingest(&table, &file_name, &bytes).await?;

    let message = if report.index_built {
        format!("Imported {} projects into {}", report.rows_imported, report.dataset)
    } else {
        format!(
            "Imported {} projects into {}; search index not built",
            report.rows_imported, report.dataset
        )
    };

    Ok(Json(UploadResponse {
        success: true,
        dataset: report.dataset,
        rows_imported: report.rows_imported,
        index_built: report.index_built,
        message,
        warnings: report.warnings,
    }))
}
