use serde::{Deserialize, Serialize};

use project_search::models::SearchHit;
use project_search::search::{SearchMode, ALL_DATASETS};

fn default_year() -> String {
    ALL_DATASETS.to_string()
}

/// Query string of /api/search/ and /api/suggestions/ / 搜索参数
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default = "default_year")]
    pub year: String,
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub search_type: SearchMode,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct YearsResponse {
    pub years: Vec<String>,
}
