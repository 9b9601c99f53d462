//! Search module / 搜索模块
//!
//! - `index`: per-dataset FTS5 index and its sync triggers
//! - `query`: query text to MATCH expression, search modes and weights
//! - `engine`: ranked search over one dataset or all of them
//! - `fanout`: bounded concurrent per-dataset execution with skip-on-failure
//! - `suggest`: prefix-matched autocomplete values

pub mod engine;
pub mod fanout;
pub mod index;
pub mod query;
pub mod suggest;

pub use engine::{is_all_datasets, SearchEngine, ALL_DATASETS};
pub use fanout::DatasetOutcome;
pub use query::{FtsQuery, SearchMode};
pub use suggest::SuggestionEngine;
