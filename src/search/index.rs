//! Per-dataset full-text index / 数据集全文索引
//!
//! Each dataset `<name>` may carry an FTS5 external-content index `fts_<name>` over
//! the searchable text columns. Triggers keep it in step with row edits.

use sqlx::SqliteConnection;

use crate::catalog::{SchemaCatalog, REQUIRED_COLUMNS};
use crate::error::{AppError, Result};
use crate::ident::DatasetName;
use crate::store::Store;

/// Indexed columns, in FTS column order / 索引列（顺序即 bm25 权重顺序）
pub const INDEXED_COLUMNS: [&str; 5] = ["project_title", "guide_name", "outcomes", "usn", "name"];

/// Ranking weights aligned with [`INDEXED_COLUMNS`]: title A, guide B, the rest C
pub const INDEX_WEIGHTS: [f64; 5] = [1.0, 0.4, 0.2, 0.2, 0.2];

/// Drop the index and its triggers if present
pub async fn drop_search_index(conn: &mut SqliteConnection, dataset: &DatasetName) -> Result<()> {
    for suffix in ["ai", "ad", "au"] {
        let sql = format!(
            "DROP TRIGGER IF EXISTS \"{}_{}\"",
            dataset.index_table(),
            suffix
        );
        sqlx::query(&sql).execute(&mut *conn).await?;
    }
    let sql = format!("DROP TABLE IF EXISTS {}", dataset.quoted_index_table());
    sqlx::query(&sql).execute(&mut *conn).await?;
    Ok(())
}

/// Create (or recreate) the index, fill it from the dataset and install sync triggers
pub async fn build_search_index(conn: &mut SqliteConnection, dataset: &DatasetName) -> Result<()> {
    drop_search_index(conn, dataset).await?;

    let table = dataset.quoted();
    let index = dataset.quoted_index_table();
    let cols = INDEXED_COLUMNS.join(", ");
    let new_cols = prefixed("new.");
    let old_cols = prefixed("old.");

    let statements = [
        format!(
            "CREATE VIRTUAL TABLE {index} USING fts5({cols}, content='{content}', content_rowid='group_no', tokenize='porter unicode61')",
            content = dataset.as_str(),
        ),
        format!("INSERT INTO {index}({index}) VALUES('rebuild')"),
        format!(
            "CREATE TRIGGER \"{bare}_ai\" AFTER INSERT ON {table} BEGIN \
             INSERT INTO {index}(rowid, {cols}) VALUES (new.group_no, {new_cols}); END",
            bare = dataset.index_table(),
        ),
        format!(
            "CREATE TRIGGER \"{bare}_ad\" AFTER DELETE ON {table} BEGIN \
             INSERT INTO {index}({index}, rowid, {cols}) VALUES ('delete', old.group_no, {old_cols}); END",
            bare = dataset.index_table(),
        ),
        format!(
            "CREATE TRIGGER \"{bare}_au\" AFTER UPDATE ON {table} BEGIN \
             INSERT INTO {index}({index}, rowid, {cols}) VALUES ('delete', old.group_no, {old_cols}); \
             INSERT INTO {index}(rowid, {cols}) VALUES (new.group_no, {new_cols}); END",
            bare = dataset.index_table(),
        ),
    ];

    for sql in &statements {
        sqlx::query(sql).execute(&mut *conn).await?;
    }
    Ok(())
}

fn prefixed(prefix: &str) -> String {
    INDEXED_COLUMNS
        .iter()
        .map(|c| format!("{}{}", prefix, c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rebuild the index of an existing dataset in one transaction / 重建索引
pub async fn rebuild(store: &Store, dataset: &DatasetName) -> Result<()> {
    let schema = SchemaCatalog::new(store.clone()).describe(dataset).await?;
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .chain(INDEXED_COLUMNS.iter())
        .copied()
        .filter(|c| !schema.has_column(c))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::data_format_with_columns(
            format!("Dataset {} lacks columns: {}", dataset, missing.join(", ")),
            &schema.columns.iter().cloned().collect::<Vec<_>>(),
        ));
    }

    let mut tx = store.pool().begin().await?;
    build_search_index(&mut *tx, dataset).await?;
    tx.commit().await?;

    tracing::info!("Search index rebuilt for dataset {}", dataset);
    Ok(())
}
