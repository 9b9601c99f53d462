//! Spreadsheet ingestion / 表格导入
//!
//! Turns one uploaded CSV or workbook into canonical project records and replaces
//! the target dataset with them:
//!
//! parse -> detect header -> clean & forward-fill -> resolve columns -> group -> load

pub mod columns;
pub mod header;
pub mod loader;
pub mod normalize;
pub mod sheet;

pub use columns::{match_column, resolve_columns, CanonicalField, ColumnMap};
pub use header::{HeaderMatch, HeaderPolicy};
pub use loader::{replace_dataset, LoadOutcome};
pub use normalize::{normalize_sheet, NormalizedSheet};
pub use sheet::{RawSheet, SheetFormat};

use serde::Serialize;

use crate::config::IngestConfig;
use crate::error::Result;
use crate::ident::DatasetName;
use crate::store::Store;

/// Summary handed back to the uploader / 导入报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub dataset: String,
    pub rows_imported: usize,
    pub index_built: bool,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct IngestionNormalizer {
    store: Store,
    policy: HeaderPolicy,
}

impl IngestionNormalizer {
    pub fn new(store: Store, policy: HeaderPolicy) -> Self {
        Self { store, policy }
    }

    pub fn from_config(store: Store, config: &IngestConfig) -> Self {
        Self::new(
            store,
            HeaderPolicy {
                scan_rows: config.header_scan_rows,
                fallback_row: config.fallback_header_row,
            },
        )
    }

    /// Parse and clean without touching the store
    pub fn normalize(&self, file_name: &str, bytes: &[u8]) -> Result<NormalizedSheet> {
        let sheet = RawSheet::parse(file_name, bytes)?;
        normalize_sheet(&sheet, &self.policy)
    }

    /// Replace dataset `dataset_name` with the contents of the uploaded file
    pub async fn ingest(&self, dataset_name: &str, file_name: &str, bytes: &[u8]) -> Result<IngestReport> {
        let dataset = DatasetName::parse_new(dataset_name)?;
        let normalized = self.normalize(file_name, bytes)?;
        tracing::info!(
            "Normalized {} into {} groups for dataset {}",
            file_name,
            normalized.records.len(),
            dataset
        );

        let outcome = replace_dataset(&self.store, &dataset, file_name, &normalized.records).await?;

        let mut warnings = normalized.warnings;
        if let Some(index_error) = outcome.index_error {
            warnings.push(index_error);
        }

        Ok(IngestReport {
            dataset: dataset.as_str().to_string(),
            rows_imported: outcome.rows_loaded,
            index_built: outcome.index_built,
            warnings,
        })
    }
}
