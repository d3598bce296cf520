use crate::models::OtpRecord;
use crate::repositories::RepositoryResult;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keyed store for live one-time codes. At most one record per identifier;
/// `put` replaces whatever was there.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait OtpStore: Send + Sync {
    async fn get(&self, token_identifier: &str) -> RepositoryResult<Option<OtpRecord>>;
    async fn put(&self, token_identifier: &str, record: OtpRecord) -> RepositoryResult<()>;
    async fn delete(&self, token_identifier: &str) -> RepositoryResult<()>;
    /// Drops records whose expiry has passed. Returns how many went.
    async fn purge_expired(&self, now: DateTime<Utc>) -> RepositoryResult<u64>;
}

/// Process-local store.
#[derive(Default)]
pub struct InMemoryOtpStore {
    records: RwLock<HashMap<String, OtpRecord>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn get(&self, token_identifier: &str) -> RepositoryResult<Option<OtpRecord>> {
        Ok(self.records.read().await.get(token_identifier).cloned())
    }

    async fn put(&self, token_identifier: &str, record: OtpRecord) -> RepositoryResult<()> {
        self.records
            .write()
            .await
            .insert(token_identifier.to_string(), record);
        Ok(())
    }

    async fn delete(&self, token_identifier: &str) -> RepositoryResult<()> {
        self.records.write().await.remove(token_identifier);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> RepositoryResult<u64> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired_at(now));
        Ok((before - records.len()) as u64)
    }
}

/// Store backed by the `otp_codes` table, shared by every process on the
/// same database.
pub struct SqliteOtpStore {
    pool: SqlitePool,
}

impl SqliteOtpStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpStore for SqliteOtpStore {
    async fn get(&self, token_identifier: &str) -> RepositoryResult<Option<OtpRecord>> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT code, expires_at FROM otp_codes WHERE token_identifier = ?")
                .bind(token_identifier)
                .fetch_optional(&self.pool)
                .await?;

        let Some((code, expires_at)) = row else {
            return Ok(None);
        };

        let expires_at = Utc
            .timestamp_millis_opt(expires_at)
            .single()
            .ok_or_else(|| {
                crate::repositories::RepositoryError::InvalidData(format!(
                    "bad otp expiry {expires_at}"
                ))
            })?;

        Ok(Some(OtpRecord { code, expires_at }))
    }

    async fn put(&self, token_identifier: &str, record: OtpRecord) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO otp_codes (token_identifier, code, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(token_identifier) DO UPDATE SET
                code = excluded.code,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(token_identifier)
        .bind(&record.code)
        .bind(record.expires_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, token_identifier: &str) -> RepositoryResult<()> {
        sqlx::query("DELETE FROM otp_codes WHERE token_identifier = ?")
            .bind(token_identifier)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> RepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM otp_codes WHERE expires_at < ?")
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(code: &str, ttl_minutes: i64) -> OtpRecord {
        OtpRecord {
            code: code.to_string(),
            expires_at: Utc::now() + Duration::minutes(ttl_minutes),
        }
    }

    #[tokio::test]
    async fn test_in_memory_put_overwrites() {
        let store = InMemoryOtpStore::new();
        store.put("r1", record("111111", 10)).await.unwrap();
        store.put("r1", record("222222", 10)).await.unwrap();

        assert_eq!(store.len().await, 1);
        let got = store.get("r1").await.unwrap().unwrap();
        assert_eq!(got.code, "222222");
    }

    #[tokio::test]
    async fn test_in_memory_delete_missing_is_ok() {
        let store = InMemoryOtpStore::new();
        store.delete("nope").await.unwrap();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_purge_expired() {
        let store = InMemoryOtpStore::new();
        store.put("live", record("012345", 10)).await.unwrap();
        store.put("dead", record("999999", -5)).await.unwrap();

        assert_eq!(store.purge_expired(Utc::now()).await.unwrap(), 1);
        assert!(store.get("dead").await.unwrap().is_none());
        assert!(store.get("live").await.unwrap().is_some());
        assert_eq!(store.purge_expired(Utc::now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sqlite_store_round_trip_and_purge() {
        let pool = crate::test_utils::test_helpers::create_test_db()
            .await
            .unwrap();
        let store = SqliteOtpStore::new(pool);

        store.put("live", record("012345", 10)).await.unwrap();
        store.put("dead", record("999999", -5)).await.unwrap();
        store.put("live", record("054321", 10)).await.unwrap();

        let live = store.get("live").await.unwrap().unwrap();
        assert_eq!(live.code, "054321");

        let purged = store.purge_expired(Utc::now()).await.unwrap();
        assert_eq!(purged, 1);
        assert!(store.get("dead").await.unwrap().is_none());

        store.delete("live").await.unwrap();
        assert!(store.get("live").await.unwrap().is_none());
    }
}
