use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::ApiResult;
use crate::state::AppState;
use project_search::models::{ProjectRecord, RecordPatch};
use project_search::search::index;

/// Last import of a dataset, from the import ledger / 导入记录
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    #[serde(skip)]
    pub dataset: String,
    pub source_file: String,
    pub rows_imported: i64,
    pub index_built: bool,
    pub imported_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub name: String,
    pub display_name: String,
    pub has_search_index: bool,
    pub last_import: Option<ImportRecord>,
}

#[derive(Debug, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<TableInfo>,
}

#[derive(Debug, Serialize)]
pub struct RowsResponse {
    pub dataset: String,
    pub rows: Vec<ProjectRecord>,
}

/// GET /api/admin/tables - 数据集列表及导入记录
pub async fn list_tables(State(state): State<Arc<AppState>>) -> ApiResult<TablesResponse> {
    let imports: Vec<ImportRecord> = sqlx::query_as(
        "SELECT dataset, source_file, rows_imported, index_built, imported_at FROM dataset_imports",
    )
    .fetch_all(state.store.pool())
    .await
    .map_err(project_search::error::AppError::from)?;
    let mut imports: HashMap<String, ImportRecord> = imports
        .into_iter()
        .map(|record| (record.dataset.clone(), record))
        .collect();

    let mut tables = Vec::new();
    for name in state.catalog.list_dataset_names().await? {
        tables.push(TableInfo {
            has_search_index: state.catalog.has_search_index(&name).await?,
            last_import: imports.remove(name.as_str()),
            display_name: name.display_name(),
            name: name.as_str().to_string(),
        });
    }
    Ok(Json(TablesResponse { tables }))
}

/// GET /api/admin/tables/:name - 查看数据行
pub async fn list_rows(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<RowsResponse> {
    let rows = state.editor.list_rows(&name).await?;
    Ok(Json(RowsResponse { dataset: name, rows }))
}

/// POST /api/admin/tables/:name - 新增数据行
pub async fn insert_row(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(record): Json<ProjectRecord>,
) -> ApiResult<Value> {
    state.editor.insert_row(&name, &record).await?;
    Ok(Json(json!({ "success": true, "group_no": record.group_no })))
}

/// PUT /api/admin/tables/:name/:group_no - 更新数据行
pub async fn update_row(
    State(state): State<Arc<AppState>>,
    Path((name, group_no)): Path<(String, i64)>,
    Json(patch): Json<RecordPatch>,
) -> ApiResult<Value> {
    let row = state.editor.update_row(&name, group_no, &patch).await?;
    Ok(Json(json!({ "success": true, "row": row })))
}

/// DELETE /api/admin/tables/:name/:group_no - 删除数据行
pub async fn delete_row(
    State(state): State<Arc<AppState>>,
    Path((name, group_no)): Path<(String, i64)>,
) -> ApiResult<Value> {
    state.editor.delete_row(&name, group_no).await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/admin/tables/:name/reindex - 重建搜索索引
pub async fn reindex(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Value> {
    let dataset = state.catalog.resolve(&name).await?;
    index::rebuild(&state.store, &dataset).await?;
    Ok(Json(json!({ "success": true, "dataset": dataset.as_str() })))
}
