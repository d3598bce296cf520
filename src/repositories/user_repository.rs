use super::{classify_write_error, RepositoryError, RepositoryResult};
use crate::models::{Audit, NewUser, Role, RoleName, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait UserRepository: Send + Sync {
    async fn exists_by_email(&self, email: &str) -> RepositoryResult<bool>;
    async fn username_exists(&self, username: &str) -> RepositoryResult<bool>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<User>>;
    async fn find_role_by_name(&self, name: RoleName) -> RepositoryResult<Option<Role>>;
    async fn find_role_by_id(&self, id: &str) -> RepositoryResult<Option<Role>>;
    /// Inserts the user and deletes the registration it came from in one
    /// transaction. `NotFound` when the registration row is already gone.
    async fn create_from_registration(
        &self,
        new_user: &NewUser,
        registration_id: &str,
    ) -> RepositoryResult<User>;
    async fn update_password(&self, id: &str, password_hash: &str) -> RepositoryResult<()>;
    async fn list_users(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> RepositoryResult<Vec<User>>;
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    role_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            audit: Audit {
                id: row.id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            role_id: row.role_id,
        }
    }
}

#[derive(FromRow)]
struct RoleRow {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RoleRow> for Role {
    type Error = RepositoryError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        Ok(Role {
            audit: Audit {
                id: row.id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            name: row.name.parse().map_err(RepositoryError::InvalidData)?,
        })
    }
}

const SELECT_USER: &str = r#"
    SELECT id, username, email, password_hash, first_name, last_name, role_id,
           created_at, updated_at
    FROM users
"#;

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn exists_by_email(&self, email: &str) -> RepositoryResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE email = ? COLLATE NOCASE",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn username_exists(&self, username: &str) -> RepositoryResult<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE email = ? COLLATE NOCASE"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    async fn find_role_by_name(&self, name: RoleName) -> RepositoryResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, created_at, updated_at FROM roles WHERE name = ?",
        )
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Role::try_from).transpose()
    }

    async fn find_role_by_id(&self, id: &str) -> RepositoryResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, created_at, updated_at FROM roles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Role::try_from).transpose()
    }

    async fn create_from_registration(
        &self,
        new_user: &NewUser,
        registration_id: &str,
    ) -> RepositoryResult<User> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users
                (id, username, email, password_hash, first_name, last_name, role_id,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new_user.audit.id)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.role_id)
        .bind(new_user.audit.created_at)
        .bind(new_user.audit.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(classify_write_error)?;

        let deleted = sqlx::query("DELETE FROM registrations WHERE id = ?")
            .bind(registration_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            // Dropping the transaction rolls the insert back.
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;

        Ok(new_user.clone().into_user())
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> RepositoryResult<()> {
        let result =
            sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
                .bind(password_hash)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_users(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> RepositoryResult<Vec<User>> {
        let limit = limit.unwrap_or(100);
        let offset = offset.unwrap_or(0);

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "{SELECT_USER} ORDER BY created_at DESC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }
}
