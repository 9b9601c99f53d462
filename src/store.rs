//! Relational store handle / 数据库句柄
//!
//! A cloneable wrapper around the SQLite pool. Every component receives one at
//! construction instead of reaching for a global engine.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;

use crate::error::Result;

#[derive(Clone)]
pub struct Store {
    db: Pool<Sqlite>,
}

impl Store {
    /// Connect to a sqlite URL, e.g. `sqlite:data/projects.db?mode=rwc` / 连接数据库
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(10));

        let db = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        // 启用WAL模式，提高并发读性能
        sqlx::query("PRAGMA journal_mode=WAL").execute(&db).await?;
        sqlx::query("PRAGMA synchronous=NORMAL").execute(&db).await?;

        tracing::info!("Store connected: {}", database_url);
        Ok(Self { db })
    }

    /// Private in-memory database on a single long-lived connection / 内存数据库
    pub async fn open_in_memory() -> Result<Self> {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { db })
    }

    /// Use an existing pool / 使用现有连接池
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.db
    }

    /// 关闭数据库连接池 / Close database connection pool
    pub async fn close(&self) {
        self.db.close().await;
    }
}
