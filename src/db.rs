use sqlx::SqlitePool;
use anyhow::Result;

/// Run database migrations / 运行数据库迁移
///
/// Dataset tables themselves are created by ingestion; only the application's
/// own bookkeeping lives here.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dataset_imports (
            dataset TEXT PRIMARY KEY,
            source_file TEXT NOT NULL,
            rows_imported INTEGER NOT NULL,
            index_built INTEGER NOT NULL DEFAULT 0,
            imported_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let store = Store::open_in_memory().await.unwrap();
        run_migrations(store.pool()).await.unwrap();
        run_migrations(store.pool()).await.unwrap();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'dataset_imports'",
        )
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(count, 1);
    }
}
