//! Dataset replacement - drop, recreate, bulk load, index / 数据集整表替换
//!
//! Everything runs in one transaction so a failed load leaves the previous table in
//! place. The index build runs inside a savepoint: if it fails the rows still
//! commit and the caller gets a warning instead of an error.

use chrono::Utc;
use futures::future::BoxFuture;
use sqlx::{Connection, SqliteConnection};

use crate::error::Result;
use crate::ident::DatasetName;
use crate::models::ProjectRecord;
use crate::search::index::{build_search_index, drop_search_index};
use crate::store::Store;

/// Result of one table replacement / 导入结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub rows_loaded: usize,
    pub index_built: bool,
    pub index_error: Option<String>,
}

/// Builds the search index of a freshly loaded dataset on the given connection
pub(crate) type IndexBuilder =
    for<'c> fn(&'c mut SqliteConnection, &'c DatasetName) -> BoxFuture<'c, Result<()>>;

fn default_index_builder<'c>(
    conn: &'c mut SqliteConnection,
    dataset: &'c DatasetName,
) -> BoxFuture<'c, Result<()>> {
    Box::pin(build_search_index(conn, dataset))
}

pub(crate) async fn create_dataset_table(conn: &mut SqliteConnection, dataset: &DatasetName) -> Result<()> {
    let sql = format!(
        r#"
        CREATE TABLE {} (
            group_no INTEGER PRIMARY KEY CHECK (group_no > 0),
            usn TEXT NOT NULL DEFAULT '',
            name TEXT NOT NULL DEFAULT '',
            project_title TEXT NOT NULL DEFAULT '',
            guide_name TEXT NOT NULL DEFAULT '',
            outcomes TEXT NOT NULL DEFAULT '',
            proof_link TEXT NOT NULL DEFAULT '',
            report_links TEXT NOT NULL DEFAULT '',
            ppt_links TEXT NOT NULL DEFAULT ''
        )
        "#,
        dataset.quoted()
    );
    sqlx::query(&sql).execute(&mut *conn).await?;
    Ok(())
}

pub(crate) async fn insert_record(
    conn: &mut SqliteConnection,
    dataset: &DatasetName,
    record: &ProjectRecord,
) -> Result<()> {
    let sql = format!(
        "INSERT INTO {} (group_no, usn, name, project_title, guide_name, outcomes, proof_link, report_links, ppt_links) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        dataset.quoted()
    );
    sqlx::query(&sql)
        .bind(record.group_no)
        .bind(record.usn_text())
        .bind(record.name_text())
        .bind(&record.project_title)
        .bind(&record.guide_name)
        .bind(&record.outcomes)
        .bind(&record.proof_link)
        .bind(&record.report_links)
        .bind(&record.ppt_links)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Replace the dataset's table wholesale with `records` and rebuild its index
pub async fn replace_dataset(
    store: &Store,
    dataset: &DatasetName,
    source_file: &str,
    records: &[ProjectRecord],
) -> Result<LoadOutcome> {
    replace_dataset_with(store, dataset, source_file, records, default_index_builder).await
}

pub(crate) async fn replace_dataset_with(
    store: &Store,
    dataset: &DatasetName,
    source_file: &str,
    records: &[ProjectRecord],
    build_index: IndexBuilder,
) -> Result<LoadOutcome> {
    let mut tx = store.pool().begin().await?;

    drop_search_index(&mut tx, dataset).await?;
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", dataset.quoted()))
        .execute(&mut *tx)
        .await?;
    create_dataset_table(&mut tx, dataset).await?;

    for record in records {
        insert_record(&mut tx, dataset, record).await?;
    }

    let index_error = {
        let mut savepoint = Connection::begin(&mut *tx).await?;
        match build_index(&mut *savepoint, dataset).await {
            Ok(()) => {
                savepoint.commit().await?;
                None
            }
            Err(e) => {
                tracing::warn!("Search index build failed for {}: {}", dataset, e);
                savepoint.rollback().await?;
                Some("search index could not be built; dataset is searchable without it".to_string())
            }
        }
    };

    sqlx::query(
        r#"
        INSERT INTO dataset_imports (dataset, source_file, rows_imported, index_built, imported_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(dataset) DO UPDATE SET
            source_file = excluded.source_file,
            rows_imported = excluded.rows_imported,
            index_built = excluded.index_built,
            imported_at = excluded.imported_at
        "#,
    )
    .bind(dataset.as_str())
    .bind(source_file)
    .bind(records.len() as i64)
    .bind(index_error.is_none())
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Dataset {} replaced: {} rows, index built: {}",
        dataset,
        records.len(),
        index_error.is_none()
    );

    Ok(LoadOutcome {
        rows_loaded: records.len(),
        index_built: index_error.is_none(),
        index_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SchemaCatalog;
    use crate::config::SearchConfig;
    use crate::search::{SearchEngine, SearchMode};

    /// Builds the index, then trips over a statement that cannot run
    fn broken_index_builder<'c>(
        conn: &'c mut SqliteConnection,
        dataset: &'c DatasetName,
    ) -> BoxFuture<'c, Result<()>> {
        Box::pin(async move {
            build_search_index(&mut *conn, dataset).await?;
            sqlx::query("SELECT * FROM no_such_table").execute(&mut *conn).await?;
            Ok(())
        })
    }

    fn record(group_no: i64, title: &str) -> ProjectRecord {
        ProjectRecord {
            group_no,
            usn: vec![format!("U{}", group_no)],
            name: vec![format!("S{}", group_no)],
            project_title: title.to_string(),
            guide_name: "Dr. Rao".to_string(),
            outcomes: String::new(),
            proof_link: String::new(),
            report_links: String::new(),
            ppt_links: String::new(),
        }
    }

    #[tokio::test]
    async fn test_replace_swaps_rows_and_updates_ledger() {
        let store = Store::open_in_memory().await.unwrap();
        crate::db::run_migrations(store.pool()).await.unwrap();
        let ds = DatasetName::parse("2023_24").unwrap();

        let first = replace_dataset(&store, &ds, "a.csv", &[record(1, "Solar"), record(2, "Wind")])
            .await
            .unwrap();
        assert_eq!(first.rows_loaded, 2);
        assert!(first.index_built);
        assert_eq!(first.index_error, None);

        replace_dataset(&store, &ds, "b.csv", &[record(7, "Tidal")]).await.unwrap();

        let groups: Vec<i64> = sqlx::query_scalar(r#"SELECT group_no FROM "2023_24""#)
            .fetch_all(store.pool())
            .await
            .unwrap();
        assert_eq!(groups, vec![7]);

        let (source, rows): (String, i64) = sqlx::query_as(
            "SELECT source_file, rows_imported FROM dataset_imports WHERE dataset = '2023_24'",
        )
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(source, "b.csv");
        assert_eq!(rows, 1);

        let hits: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "fts_2023_24" WHERE "fts_2023_24" MATCH 'solar'"#)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(hits, 0);
        assert!(SchemaCatalog::new(store.clone()).has_search_index(&ds).await.unwrap());
    }

    #[tokio::test]
    async fn test_index_failure_keeps_rows_and_falls_back_to_temp_search() {
        let store = Store::open_in_memory().await.unwrap();
        crate::db::run_migrations(store.pool()).await.unwrap();
        let ds = DatasetName::parse("2023_24").unwrap();
        let records = [
            record(1, "Solar Tracker"),
            record(2, "Wind Farm Monitor"),
            record(3, "Library Kiosk"),
            record(4, "Parking Finder"),
        ];

        let outcome = replace_dataset_with(&store, &ds, "a.csv", &records, broken_index_builder)
            .await
            .unwrap();
        assert_eq!(outcome.rows_loaded, 4);
        assert!(!outcome.index_built);
        assert!(outcome
            .index_error
            .as_deref()
            .is_some_and(|w| w.contains("search index could not be built")));

        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "2023_24""#)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 4);

        let built: bool =
            sqlx::query_scalar("SELECT index_built FROM dataset_imports WHERE dataset = '2023_24'")
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert!(!built);

        // the savepoint took the half-built index and its triggers with it
        let catalog = SchemaCatalog::new(store.clone());
        assert!(!catalog.has_search_index(&ds).await.unwrap());
        let triggers: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'trigger' AND name LIKE 'fts_2023_24_%'",
        )
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(triggers, 0);

        let engine = SearchEngine::new(store.clone(), SearchConfig::default());
        let hits = engine.search("2023-24", "solar", SearchMode::All).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].group_no, 1);
        assert_eq!(hits[0].year, "2023-24");
    }
}
