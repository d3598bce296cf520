use super::{classify_write_error, RepositoryError, RepositoryResult};
use crate::models::{Audit, Registration, StepSet};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait RegistrationRepository: Send + Sync {
    /// Fails with `EmailTaken` when a registration for the email already exists.
    async fn create(&self, registration: &Registration) -> RepositoryResult<()>;
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Registration>>;
    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Registration>>;
    async fn update_steps(&self, registration: &Registration) -> RepositoryResult<()>;
}

#[derive(FromRow)]
struct RegistrationRow {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
    completed_steps: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = RepositoryError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        let completed_steps =
            StepSet::decode(&row.completed_steps).map_err(RepositoryError::InvalidData)?;
        Ok(Registration {
            audit: Audit {
                id: row.id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            completed_steps,
        })
    }
}

const SELECT_REGISTRATION: &str = r#"
    SELECT id, email, first_name, last_name, completed_steps, created_at, updated_at
    FROM registrations
"#;

pub struct SqliteRegistrationRepository {
    pool: SqlitePool,
}

impl SqliteRegistrationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrationRepository for SqliteRegistrationRepository {
    async fn create(&self, registration: &Registration) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO registrations
                (id, email, first_name, last_name, completed_steps, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&registration.audit.id)
        .bind(&registration.email)
        .bind(&registration.first_name)
        .bind(&registration.last_name)
        .bind(registration.completed_steps.encode())
        .bind(registration.audit.created_at)
        .bind(registration.audit.updated_at)
        .execute(&self.pool)
        .await
        .map_err(classify_write_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!("{SELECT_REGISTRATION} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Registration::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "{SELECT_REGISTRATION} WHERE email = ? COLLATE NOCASE"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Registration::try_from).transpose()
    }

    async fn update_steps(&self, registration: &Registration) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE registrations SET completed_steps = ?, updated_at = ? WHERE id = ?",
        )
        .bind(registration.completed_steps.encode())
        .bind(registration.audit.updated_at)
        .bind(&registration.audit.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
