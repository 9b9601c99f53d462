//! Schema catalog - discovers dataset tables and their columns / 数据集目录
//!
//! Read-only view over the store's table catalog. A table counts as a dataset when it
//! is an ordinary table of the main schema, passes the identifier allowlist and is not
//! one of the reserved store/application tables. FTS5 index tables are virtual or
//! shadow tables and never show up here.

use serde::Serialize;
use sqlx::Row;
use std::collections::BTreeSet;

use crate::error::{AppError, Result};
use crate::ident::{is_reserved_table, is_safe_identifier, DatasetName};
use crate::store::Store;

/// Columns every dataset must expose to be searchable / 必需列
pub const REQUIRED_COLUMNS: &[&str] = &["group_no", "usn", "name", "project_title", "guide_name"];

/// Columns substituted with '' when a dataset lacks them / 可选列
pub const OPTIONAL_COLUMNS: &[&str] = &["outcomes", "proof_link", "report_links", "ppt_links"];

/// What one dataset exposes / 数据集结构
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSchema {
    pub columns: BTreeSet<String>,
    /// Whether the precomputed FTS5 index exists
    pub has_search_index: bool,
}

impl DatasetSchema {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !self.columns.contains(*c))
            .collect()
    }
}

#[derive(Clone)]
pub struct SchemaCatalog {
    store: Store,
}

impl SchemaCatalog {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Dataset tables, sorted by stored name
    pub async fn list_dataset_names(&self) -> Result<Vec<DatasetName>> {
        let rows = sqlx::query(
            "SELECT name FROM pragma_table_list WHERE schema = 'main' AND type = 'table'",
        )
        .fetch_all(self.store.pool())
        .await
        .map_err(|e| {
            tracing::error!("Catalog query failed: {}", e);
            AppError::from(e)
        })?;

        let mut names: Vec<DatasetName> = rows
            .iter()
            .filter_map(|row| row.try_get::<String, _>("name").ok())
            .filter(|name| is_safe_identifier(name) && !is_reserved_table(name))
            .filter_map(|name| DatasetName::parse(&name).ok())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Display names (`2024-25`) in deterministic order / 数据集展示名列表
    pub async fn list_datasets(&self) -> Result<Vec<String>> {
        Ok(self
            .list_dataset_names()
            .await?
            .iter()
            .map(DatasetName::display_name)
            .collect())
    }

    /// Map a requested name onto a known dataset, or fail with `InvalidDataset`
    pub async fn resolve(&self, requested: &str) -> Result<DatasetName> {
        let name = DatasetName::parse(requested)
            .map_err(|_| AppError::InvalidDataset(requested.to_string()))?;
        if self.list_dataset_names().await?.contains(&name) {
            Ok(name)
        } else {
            Err(AppError::InvalidDataset(requested.to_string()))
        }
    }

    /// Column names of one dataset / 获取表的列
    pub async fn list_columns(&self, dataset: &DatasetName) -> Result<BTreeSet<String>> {
        let rows = sqlx::query("SELECT name FROM pragma_table_info(?)")
            .bind(dataset.as_str())
            .fetch_all(self.store.pool())
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| row.try_get::<String, _>("name").ok())
            .collect())
    }

    pub async fn has_search_index(&self, dataset: &DatasetName) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_list WHERE schema = 'main' AND type = 'virtual' AND name = ?",
        )
        .bind(dataset.index_table())
        .fetch_one(self.store.pool())
        .await?;
        Ok(count > 0)
    }

    pub async fn describe(&self, dataset: &DatasetName) -> Result<DatasetSchema> {
        Ok(DatasetSchema {
            columns: self.list_columns(dataset).await?,
            has_search_index: self.has_search_index(dataset).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_tables(ddl: &[&str]) -> Store {
        let store = Store::open_in_memory().await.unwrap();
        crate::db::run_migrations(store.pool()).await.unwrap();
        for stmt in ddl {
            sqlx::query(stmt).execute(store.pool()).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_lists_only_dataset_tables_sorted() {
        let store = store_with_tables(&[
            r#"CREATE TABLE "2024_25" (group_no INTEGER PRIMARY KEY, usn TEXT)"#,
            r#"CREATE TABLE "2023_24" (group_no INTEGER PRIMARY KEY, usn TEXT)"#,
            r#"CREATE TABLE "bad-name" (x TEXT)"#,
            r#"CREATE VIRTUAL TABLE "fts_2023_24" USING fts5(project_title)"#,
            r#"CREATE VIEW recent AS SELECT * FROM "2024_25""#,
        ])
        .await;

        let catalog = SchemaCatalog::new(store);
        let years = catalog.list_datasets().await.unwrap();
        assert_eq!(years, vec!["2023-24".to_string(), "2024-25".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_unknown_dataset() {
        let store = store_with_tables(&[r#"CREATE TABLE "2024_25" (group_no INTEGER)"#]).await;
        let catalog = SchemaCatalog::new(store);

        assert_eq!(catalog.resolve("2024-25").await.unwrap().as_str(), "2024_25");
        assert!(matches!(
            catalog.resolve("2030-31").await,
            Err(AppError::InvalidDataset(_))
        ));
        assert!(matches!(
            catalog.resolve("x; drop").await,
            Err(AppError::InvalidDataset(_))
        ));
        assert!(matches!(
            catalog.resolve("dataset_imports").await,
            Err(AppError::InvalidDataset(_))
        ));
    }

    #[tokio::test]
    async fn test_describe_reports_columns_and_index() {
        let store = store_with_tables(&[
            r#"CREATE TABLE "2022_23" (group_no INTEGER PRIMARY KEY, usn TEXT, name TEXT, project_title TEXT)"#,
        ])
        .await;
        let catalog = SchemaCatalog::new(store);
        let name = DatasetName::parse("2022_23").unwrap();

        let schema = catalog.describe(&name).await.unwrap();
        assert!(schema.has_column("usn"));
        assert!(!schema.has_search_index);
        assert_eq!(schema.missing_required(), vec!["guide_name"]);
    }
}
