//! SQLite index of stored blocks.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::error::Result;

const FILE_POOL_SIZE: u32 = 5;

#[derive(Debug, Clone)]
pub(crate) struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        Self::connect(options, SqlitePoolOptions::new().max_connections(FILE_POOL_SIZE))
            .await
    }

    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().filename(":memory:");
        Self::connect(options, memory_pool()).await
    }

    async fn connect(options: SqliteConnectOptions, pool: SqlitePoolOptions) -> Result<Self> {
        let pool = pool.connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Index a block; `false` if the id was already indexed
    pub async fn insert_block(&self, id: &str, size: i64) -> Result<bool> {
        let inserted = sqlx::query(
            "INSERT INTO blocks (id, size, created_at) VALUES (?, ?, ?) ON CONFLICT(id) DO NOTHING",
        )
        .bind(id)
        .bind(size)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(inserted > 0)
    }

    pub async fn block_size(&self, id: &str) -> Result<Option<i64>> {
        let size = sqlx::query_scalar("SELECT size FROM blocks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(size)
    }

    pub async fn has_block(&self, id: &str) -> Result<bool> {
        Ok(self.block_size(id).await?.is_some())
    }

    pub async fn count_blocks(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM blocks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn total_size(&self) -> Result<i64> {
        let total = sqlx::query_scalar("SELECT COALESCE(SUM(size), 0) FROM blocks")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

/// Each `:memory:` connection is a separate database, so the pool holds
///  exactly one and never lets it idle out or expire.
fn memory_pool() -> SqlitePoolOptions {
    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
}
