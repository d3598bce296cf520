pub mod registration_repository;
pub mod subscriber_repository;
pub mod user_repository;

pub use registration_repository::{RegistrationRepository, SqliteRegistrationRepository};
pub use subscriber_repository::{SqliteSubscriberRepository, SubscriberRepository};
pub use user_repository::{SqliteUserRepository, UserRepository};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Record not found")]
    NotFound,
    #[error("Email already exists")]
    EmailTaken,
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Maps SQLite UNIQUE violations onto the column that caused them.
pub(crate) fn classify_write_error(err: sqlx::Error) -> RepositoryError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            if message.contains(".username") {
                return RepositoryError::UsernameTaken;
            }
            if message.contains(".email") {
                return RepositoryError::EmailTaken;
            }
        }
    }
    RepositoryError::Database(err)
}
