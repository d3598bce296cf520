use super::{classify_write_error, RepositoryError, RepositoryResult};
use crate::models::{Audit, Subscriber};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait SubscriberRepository: Send + Sync {
    async fn create(&self, subscriber: &Subscriber) -> RepositoryResult<()>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Subscriber>>;
    async fn set_active(&self, id: &str, active: bool) -> RepositoryResult<()>;
    async fn list_all(&self) -> RepositoryResult<Vec<Subscriber>>;
    async fn list_active(&self) -> RepositoryResult<Vec<Subscriber>>;
    async fn count_active(&self) -> RepositoryResult<i64>;
}

#[derive(FromRow)]
struct SubscriberRow {
    id: String,
    email: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SubscriberRow> for Subscriber {
    fn from(row: SubscriberRow) -> Self {
        Subscriber {
            audit: Audit {
                id: row.id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            email: row.email,
            active: row.active,
        }
    }
}

pub struct SqliteSubscriberRepository {
    pool: SqlitePool,
}

impl SqliteSubscriberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriberRepository for SqliteSubscriberRepository {
    async fn create(&self, subscriber: &Subscriber) -> RepositoryResult<()> {
        sqlx::query(
            "INSERT INTO subscribers (id, email, active, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&subscriber.audit.id)
        .bind(&subscriber.email)
        .bind(subscriber.active)
        .bind(subscriber.audit.created_at)
        .bind(subscriber.audit.updated_at)
        .execute(&self.pool)
        .await
        .map_err(classify_write_error)?;

        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Subscriber>> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            r#"
            SELECT id, email, active, created_at, updated_at
            FROM subscribers
            WHERE email = ? COLLATE NOCASE
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Subscriber::from))
    }

    async fn set_active(&self, id: &str, active: bool) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE subscribers SET active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_all(&self) -> RepositoryResult<Vec<Subscriber>> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            "SELECT id, email, active, created_at, updated_at FROM subscribers ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Subscriber::from).collect())
    }

    async fn list_active(&self) -> RepositoryResult<Vec<Subscriber>> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            r#"
            SELECT id, email, active, created_at, updated_at
            FROM subscribers
            WHERE active = 1
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Subscriber::from).collect())
    }

    async fn count_active(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscribers WHERE active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
