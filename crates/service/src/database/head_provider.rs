use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use common::backend::BackendError;
use common::graph::{HeadError, HeadProvider};
use common::linked_data::CommitId;

use crate::database::{
    types::{DObjectId, DUuid},
    Database,
};

fn backend(e: sqlx::Error) -> BackendError {
    BackendError::Default(e.into())
}

#[async_trait]
impl HeadProvider for Database {
    async fn head(&self, repo: Uuid) -> Result<Option<CommitId>, BackendError> {
        let row = sqlx::query(
            r#"
            SELECT head
            FROM repo_heads
            WHERE repo_id = ?
            "#,
        )
        .bind(DUuid::from(repo))
        .fetch_optional(&**self)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => {
                let head: DObjectId = row.try_get("head").map_err(backend)?;
                Ok(Some(head.into()))
            }
            None => Ok(None),
        }
    }

    async fn compare_and_swap(
        &self,
        repo: Uuid,
        expected: Option<CommitId>,
        new: CommitId,
    ) -> Result<(), HeadError> {
        let now = Utc::now().timestamp();

        // the WHERE clause is the compare; a lost race affects no rows
        let query = match expected {
            Some(expected) => sqlx::query(
                r#"
                UPDATE repo_heads
                SET head = ?, updated_at = ?
                WHERE repo_id = ? AND head = ?
                "#,
            )
            .bind(DObjectId::from(new))
            .bind(now)
            .bind(DUuid::from(repo))
            .bind(DObjectId::from(expected)),
            None => sqlx::query(
                r#"
                INSERT INTO repo_heads (repo_id, head, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(repo_id) DO NOTHING
                "#,
            )
            .bind(DUuid::from(repo))
            .bind(DObjectId::from(new))
            .bind(now),
        };

        let result = query.execute(&**self).await.map_err(backend)?;
        if result.rows_affected() == 1 {
            return Ok(());
        }

        let actual = self.head(repo).await?;
        Err(HeadError::Mismatch { expected, actual })
    }

    async fn repos(&self) -> Result<Vec<Uuid>, BackendError> {
        let rows = sqlx::query("SELECT repo_id FROM repo_heads ORDER BY repo_id")
            .fetch_all(&**self)
            .await
            .map_err(backend)?;

        rows.into_iter()
            .map(|row| {
                row.try_get::<DUuid, _>("repo_id")
                    .map(Uuid::from)
                    .map_err(backend)
            })
            .collect()
    }
}
