use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use common::backend::BackendError;
use common::path::RepoPath;
use common::token::{Operation, TokenError, TokenRecord, TokenStore};

use crate::database::{types::DUuid, Database};

fn backend(e: sqlx::Error) -> BackendError {
    BackendError::Default(e.into())
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, BackendError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| BackendError::Malformed(format!("timestamp out of range: {}", ms)))
}

fn record_from_row(row: &SqliteRow) -> Result<TokenRecord, BackendError> {
    let operation: String = row.try_get("operation").map_err(backend)?;
    let path: String = row.try_get("path").map_err(backend)?;
    let issued_at: i64 = row.try_get("issued_at").map_err(backend)?;
    let expires_at: i64 = row.try_get("expires_at").map_err(backend)?;
    let consumed: i64 = row.try_get("consumed").map_err(backend)?;

    Ok(TokenRecord {
        token: row.try_get("token").map_err(backend)?,
        repo_id: row.try_get::<DUuid, _>("repo_id").map_err(backend)?.into(),
        user: row.try_get("user").map_err(backend)?,
        operation: operation
            .parse::<Operation>()
            .map_err(|e| BackendError::Malformed(e.to_string()))?,
        path: RepoPath::parse(&path).map_err(|e| BackendError::Malformed(e.to_string()))?,
        issued_at: from_millis(issued_at)?,
        ttl_secs: (expires_at - issued_at) / 1000,
        consumed: consumed != 0,
    })
}

#[async_trait]
impl TokenStore for Database {
    async fn insert(&self, record: TokenRecord) -> Result<(), BackendError> {
        sqlx::query(
            r#"
            INSERT INTO transfer_tokens
                (token, repo_id, user, operation, path, issued_at, expires_at, consumed)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.token)
        .bind(DUuid::from(record.repo_id))
        .bind(&record.user)
        .bind(record.operation.as_str())
        .bind(record.path.as_dir_string())
        .bind(record.issued_at.timestamp_millis())
        .bind(record.expires_at().timestamp_millis())
        .bind(record.consumed as i64)
        .execute(&**self)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<TokenRecord>, BackendError> {
        let row = sqlx::query(
            r#"
            SELECT token, repo_id, user, operation, path, issued_at, expires_at, consumed
            FROM transfer_tokens
            WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&**self)
        .await
        .map_err(backend)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn redeem(&self, token: &str, now: DateTime<Utc>) -> Result<TokenRecord, TokenError> {
        // one conditional UPDATE: only a single redemption can flip the flag
        let result = sqlx::query(
            r#"
            UPDATE transfer_tokens
            SET consumed = 1
            WHERE token = ? AND consumed = 0 AND expires_at > ?
            "#,
        )
        .bind(token)
        .bind(now.timestamp_millis())
        .execute(&**self)
        .await
        .map_err(backend)?;

        let record = self.get(token).await?.ok_or(TokenError::NotFound)?;
        if result.rows_affected() == 1 {
            return Ok(record);
        }
        if record.consumed {
            Err(TokenError::Consumed)
        } else {
            Err(TokenError::Expired)
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, BackendError> {
        let result = sqlx::query("DELETE FROM transfer_tokens WHERE expires_at <= ?")
            .bind(now.timestamp_millis())
            .execute(&**self)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn record(token: &str, issued_at: DateTime<Utc>) -> TokenRecord {
        TokenRecord {
            token: token.to_string(),
            repo_id: Uuid::new_v4(),
            user: "alice@example.com".to_string(),
            operation: Operation::UploadBlocks,
            path: RepoPath::parse("/docs/").unwrap(),
            issued_at,
            ttl_secs: 60,
            consumed: false,
        }
    }

    #[tokio::test]
    async fn test_round_trip_through_sqlite() {
        let db = Database::memory().await.unwrap();
        let now = DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap();
        let rec = record("tok", now);
        db.insert(rec.clone()).await.unwrap();
        assert_eq!(db.get("tok").await.unwrap(), Some(rec));
        assert_eq!(db.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_redeem_lifecycle() {
        let db = Database::memory().await.unwrap();
        let now = Utc::now();
        db.insert(record("once", now)).await.unwrap();
        db.insert(record("late", now)).await.unwrap();

        let redeemed = db.redeem("once", now).await.unwrap();
        assert!(redeemed.consumed);
        assert_eq!(redeemed.operation, Operation::UploadBlocks);
        assert!(matches!(
            db.redeem("once", now).await,
            Err(TokenError::Consumed)
        ));
        assert!(matches!(
            db.redeem("late", now + Duration::seconds(60)).await,
            Err(TokenError::Expired)
        ));
        assert!(matches!(
            db.redeem("nope", now).await,
            Err(TokenError::NotFound)
        ));

        assert_eq!(db.purge_expired(now + Duration::seconds(61)).await.unwrap(), 2);
        assert_eq!(db.get("late").await.unwrap(), None);
    }
}
