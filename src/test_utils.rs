pub mod test_helpers {
    use crate::config::AppConfig;
    use crate::models::RoleName;
    use crate::services::email_service::{EmailError, EmailSender};
    use crate::services::{InMemoryOtpStore, JwtTokenIssuer, OtpStore, TokenIssuer};
    use crate::AppState;
    use async_trait::async_trait;
    use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;

    pub const TEST_JWT_KEY: &[u8] = b"integration-test-signing-key-0123456789";

    /// Create a new in-memory SQLite database for testing
    pub async fn create_test_db() -> Result<SqlitePool, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(":memory:")
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(pool)
    }

    /// Create a temporary file-based SQLite database for testing
    /// Useful when several connections must see the same data
    pub async fn create_test_db_file() -> Result<(SqlitePool, NamedTempFile), sqlx::Error> {
        let temp_file = NamedTempFile::new().map_err(sqlx::Error::Io)?;
        let db_path = temp_file
            .path()
            .to_str()
            .ok_or_else(|| sqlx::Error::Configuration("Invalid database path".into()))?;
        let database_url = format!("sqlite://{}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&database_url)
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok((pool, temp_file))
    }

    /// Insert a user with a hashed password directly, bypassing registration.
    /// Returns the new user id.
    pub async fn insert_test_user(
        pool: &SqlitePool,
        username: &str,
        email: &str,
        password: &str,
        role: RoleName,
    ) -> Result<String, sqlx::Error> {
        use argon2::{
            password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
            Argon2,
        };

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                sqlx::Error::Configuration(format!("Password hashing failed: {}", e).into())
            })?
            .to_string();

        let role_id: String = sqlx::query_scalar("SELECT id FROM roles WHERE name = ?")
            .bind(role.as_str())
            .fetch_one(pool)
            .await?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users
                (id, username, email, password_hash, first_name, last_name, role_id,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, 'test', 'user', ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role_id)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(id)
    }

    #[derive(Debug, Clone)]
    pub struct SentEmail {
        pub to: Vec<String>,
        pub subject: String,
        pub html_body: String,
    }

    impl SentEmail {
        /// First run of six consecutive ASCII digits in the body.
        pub fn otp_code(&self) -> Option<String> {
            let bytes = self.html_body.as_bytes();
            bytes
                .windows(6)
                .enumerate()
                .find(|(i, w)| {
                    w.iter().all(u8::is_ascii_digit)
                        && (*i == 0 || !bytes[i - 1].is_ascii_digit())
                        && bytes.get(i + 6).is_none_or(|b| !b.is_ascii_digit())
                })
                .map(|(_, w)| String::from_utf8_lossy(w).into_owned())
        }
    }

    /// Records every message instead of delivering it.
    #[derive(Default)]
    pub struct CapturingEmailSender {
        sent: Mutex<Vec<SentEmail>>,
    }

    impl CapturingEmailSender {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent(&self) -> Vec<SentEmail> {
            self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }

        pub fn count(&self) -> usize {
            self.sent.lock().unwrap_or_else(|e| e.into_inner()).len()
        }

        pub fn last_to(&self, email: &str) -> Option<SentEmail> {
            self.sent()
                .into_iter()
                .rev()
                .find(|m| m.to.iter().any(|to| to == email))
        }

        /// The code in the most recent message addressed to `email`.
        pub fn last_code_for(&self, email: &str) -> Option<String> {
            self.last_to(email).and_then(|m| m.otp_code())
        }
    }

    #[async_trait]
    impl EmailSender for CapturingEmailSender {
        async fn send(
            &self,
            to: &[String],
            subject: &str,
            html_body: &str,
        ) -> Result<String, EmailError> {
            let mut sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
            sent.push(SentEmail {
                to: to.to_vec(),
                subject: subject.to_string(),
                html_body: html_body.to_string(),
            });
            Ok(format!("captured-{}", sent.len()))
        }
    }

    /// Fails every send.
    #[derive(Default)]
    pub struct FailingEmailSender;

    #[async_trait]
    impl EmailSender for FailingEmailSender {
        async fn send(
            &self,
            _to: &[String],
            _subject: &str,
            _html_body: &str,
        ) -> Result<String, EmailError> {
            Err(EmailError::SendFailed("provider unavailable".to_string()))
        }
    }

    pub struct TestApp {
        pub state: AppState,
        pub pool: SqlitePool,
        pub emails: Arc<CapturingEmailSender>,
        pub otp_store: Arc<InMemoryOtpStore>,
        pub tokens: Arc<JwtTokenIssuer>,
    }

    /// Fully wired state over a fresh in-memory database.
    pub async fn create_test_app(config: AppConfig) -> Result<TestApp, sqlx::Error> {
        let pool = create_test_db().await?;
        let emails = Arc::new(CapturingEmailSender::new());
        let otp_store = Arc::new(InMemoryOtpStore::new());
        let tokens = Arc::new(JwtTokenIssuer::new(
            TEST_JWT_KEY,
            chrono::Duration::minutes(30),
        ));

        let state = AppState::build_with_issuer(
            pool.clone(),
            config,
            emails.clone() as Arc<dyn EmailSender>,
            otp_store.clone() as Arc<dyn OtpStore>,
            tokens.clone() as Arc<dyn TokenIssuer>,
        );

        Ok(TestApp {
            state,
            pool,
            emails,
            otp_store,
            tokens,
        })
    }
}
