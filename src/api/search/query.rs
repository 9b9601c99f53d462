use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use super::types::*;
use crate::api::{ApiError, ApiResult};
use crate::state::AppState;

fn check_query(state: &AppState, q: &str) -> Result<(), ApiError> {
    let min = state.config.search.min_query_len;
    if q.trim().chars().count() < min {
        return Err(ApiError::BadRequest(format!(
            "Query must be at least {} characters",
            min
        )));
    }
    Ok(())
}

/// GET /api/years - 数据集列表
pub async fn years(State(state): State<Arc<AppState>>) -> ApiResult<YearsResponse> {
    let years = state.catalog.list_datasets().await?;
    Ok(Json(YearsResponse { years }))
}

/// GET /api/search/ - 搜索
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<SearchResponse> {
    check_query(&state, &params.q)?;
    tracing::debug!(
        "搜索: year={} q={} mode={:?}",
        params.year,
        params.q,
        params.search_type
    );

    let results = state
        .search
        .search(&params.year, params.q.trim(), params.search_type)
        .await?;
    Ok(Json(SearchResponse { results }))
}

/// GET /api/suggestions/ - 搜索建议
pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<SuggestionResponse> {
    check_query(&state, &params.q)?;
    let suggestions = state
        .suggest
        .suggest(&params.year, params.q.trim(), params.search_type)
        .await?;
    Ok(Json(SuggestionResponse { suggestions }))
}
