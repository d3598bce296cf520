use crate::models::{Audit, NewUser, Registration, RoleName, User, MAX_USERNAME_LEN};
use crate::repositories::{RepositoryError, UserRepository};
use crate::services::password::{HashingError, PasswordHasher};
use std::sync::Arc;

/// Length a disambiguated base is cut to before the numeric suffix.
const SUFFIX_BASE_LEN: usize = 47;
const MAX_USERNAME_SUFFIX: u32 = 999;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Role not found: {0}")]
    RoleNotFound(RoleName),
    #[error("A user already exists with the supplied email")]
    EmailTaken,
    #[error("Unknown registration id")]
    RegistrationNotFound,
    #[error("No free username derived from {0}")]
    UsernameExhausted(String),
    #[error(transparent)]
    Hashing(#[from] HashingError),
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

/// Turns a verified registration into a durable user.
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { users, hasher }
    }

    /// Creates the user and deletes `registration` in one transaction.
    pub async fn create_user(
        &self,
        registration: &Registration,
        password: &str,
        role: RoleName,
    ) -> Result<User, AccountError> {
        let role = self
            .users
            .find_role_by_name(role)
            .await?
            .ok_or_else(|| {
                tracing::error!("Role {} missing from the role catalog", role);
                AccountError::RoleNotFound(role)
            })?;

        let password_hash = self.hasher.hash(password)?;

        for username in username_candidates(
            &registration.email,
            &registration.first_name,
            &registration.last_name,
        ) {
            if self.users.username_exists(&username).await? {
                continue;
            }

            let new_user = NewUser {
                audit: Audit::new(),
                username: username.clone(),
                email: registration.email.clone(),
                password_hash: password_hash.clone(),
                first_name: registration.first_name.clone(),
                last_name: registration.last_name.clone(),
                role_id: role.audit.id.clone(),
            };

            match self
                .users
                .create_from_registration(&new_user, &registration.audit.id)
                .await
            {
                Ok(user) => {
                    tracing::info!(
                        "Account materialized: user {} ({}) from registration {}",
                        user.audit.id,
                        user.username,
                        registration.audit.id
                    );
                    return Ok(user);
                }
                Err(RepositoryError::UsernameTaken) => {
                    tracing::warn!("Username {} claimed concurrently, trying next", username);
                }
                Err(RepositoryError::EmailTaken) => return Err(AccountError::EmailTaken),
                Err(RepositoryError::NotFound) => return Err(AccountError::RegistrationNotFound),
                Err(e) => return Err(e.into()),
            }
        }

        Err(AccountError::UsernameExhausted(registration.email.clone()))
    }
}

/// Usernames to try, in order:
/// 1. the email local part, when it fits;
/// 2. `first-last`, cut to the length limit;
/// 3. `first-last` cut to 47 characters plus 1, 2, 3 ... 999.
pub fn username_candidates(
    email: &str,
    first_name: &str,
    last_name: &str,
) -> impl Iterator<Item = String> {
    let local_part = email.split('@').next().unwrap_or_default();
    let local = (!local_part.is_empty() && local_part.chars().count() <= MAX_USERNAME_LEN)
        .then(|| local_part.to_string());

    let full_name = format!("{}-{}", first_name, last_name);
    let named = truncate_chars(&full_name, MAX_USERNAME_LEN);
    let base = truncate_chars(&full_name, SUFFIX_BASE_LEN);

    local
        .into_iter()
        .chain(std::iter::once(named))
        .chain((1..=MAX_USERNAME_SUFFIX).map(move |n| format!("{}{}", base, n)))
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::repositories::user_repository::MockUserRepository;
    use crate::services::password::Argon2PasswordHasher;
    use mockall::predicate::*;

    fn registration() -> Registration {
        Registration::new(
            "jane.doe@example.com".to_string(),
            "Jane".to_string(),
            "Doe".to_string(),
        )
    }

    fn reader_role() -> Role {
        Role {
            audit: Audit::new(),
            name: RoleName::Reader,
        }
    }

    fn expect_reader_role(mock: &mut MockUserRepository) {
        mock.expect_find_role_by_name()
            .with(eq(RoleName::Reader))
            .returning(|_| Box::pin(async move { Ok(Some(reader_role())) }));
    }

    #[test]
    fn test_candidates_start_with_local_part() {
        let mut candidates = username_candidates("jane.doe@example.com", "Jane", "Doe");
        assert_eq!(candidates.next().as_deref(), Some("jane.doe"));
        assert_eq!(candidates.next().as_deref(), Some("Jane-Doe"));
        assert_eq!(candidates.next().as_deref(), Some("Jane-Doe1"));
        assert_eq!(candidates.next().as_deref(), Some("Jane-Doe2"));
    }

    #[test]
    fn test_long_local_part_is_skipped() {
        let email = format!("{}@example.com", "a".repeat(51));
        let first = username_candidates(&email, "ann", "lee").next();
        assert_eq!(first.as_deref(), Some("ann-lee"));
    }

    #[test]
    fn test_long_names_truncate_before_suffix() {
        let first = "f".repeat(40);
        let last = "l".repeat(40);
        let email = format!("{}@example.com", "x".repeat(60));
        let candidates: Vec<String> = username_candidates(&email, &first, &last).collect();

        assert_eq!(candidates[0].chars().count(), 50);
        assert_eq!(candidates[1].chars().count(), 48);
        assert!(candidates[1].ends_with('1'));
        assert!(candidates
            .iter()
            .all(|c| c.chars().count() <= MAX_USERNAME_LEN));
        assert_eq!(candidates.len(), 1 + MAX_USERNAME_SUFFIX as usize);
    }

    #[test]
    fn test_truncation_counts_characters() {
        let first = "é".repeat(30);
        let last = "ü".repeat(30);
        let named = username_candidates("x@y.z", &first, &last).nth(1).unwrap();
        assert_eq!(named.chars().count(), 50);
    }

    #[tokio::test]
    async fn test_create_user_uses_local_part() {
        let mut mock = MockUserRepository::new();
        expect_reader_role(&mut mock);
        mock.expect_username_exists()
            .with(eq("jane.doe"))
            .times(1)
            .returning(|_| Box::pin(async move { Ok(false) }));
        mock.expect_create_from_registration()
            .times(1)
            .returning(|new_user, _| {
                let user = new_user.clone().into_user();
                Box::pin(async move { Ok(user) })
            });

        let service = AccountService::new(Arc::new(mock), Arc::new(Argon2PasswordHasher));
        let user = service
            .create_user(&registration(), "Passw0rd!", RoleName::Reader)
            .await
            .unwrap();

        assert_eq!(user.username, "jane.doe");
        assert_ne!(user.password_hash, "Passw0rd!");
    }

    #[tokio::test]
    async fn test_taken_local_part_falls_back_to_full_name() {
        let mut mock = MockUserRepository::new();
        expect_reader_role(&mut mock);
        mock.expect_username_exists()
            .returning(|name| {
                let taken = name == "jane.doe";
                Box::pin(async move { Ok(taken) })
            });
        mock.expect_create_from_registration()
            .times(1)
            .returning(|new_user, _| {
                let user = new_user.clone().into_user();
                Box::pin(async move { Ok(user) })
            });

        let service = AccountService::new(Arc::new(mock), Arc::new(Argon2PasswordHasher));
        let user = service
            .create_user(&registration(), "Passw0rd!", RoleName::Reader)
            .await
            .unwrap();

        assert_eq!(user.username, "Jane-Doe");
    }

    #[tokio::test]
    async fn test_unique_violation_advances_candidate() {
        let mut mock = MockUserRepository::new();
        expect_reader_role(&mut mock);
        mock.expect_username_exists()
            .returning(|_| Box::pin(async move { Ok(false) }));
        mock.expect_create_from_registration()
            .returning(|new_user, _| {
                let result = if new_user.username == "jane.doe" {
                    Err(RepositoryError::UsernameTaken)
                } else {
                    Ok(new_user.clone().into_user())
                };
                Box::pin(async move { result })
            });

        let service = AccountService::new(Arc::new(mock), Arc::new(Argon2PasswordHasher));
        let user = service
            .create_user(&registration(), "Passw0rd!", RoleName::Reader)
            .await
            .unwrap();

        assert_eq!(user.username, "Jane-Doe");
    }

    #[tokio::test]
    async fn test_missing_role_is_reported() {
        let mut mock = MockUserRepository::new();
        mock.expect_find_role_by_name()
            .returning(|_| Box::pin(async move { Ok(None) }));

        let service = AccountService::new(Arc::new(mock), Arc::new(Argon2PasswordHasher));
        let result = service
            .create_user(&registration(), "Passw0rd!", RoleName::Admin)
            .await;

        assert!(matches!(
            result,
            Err(AccountError::RoleNotFound(RoleName::Admin))
        ));
    }

    #[tokio::test]
    async fn test_email_violation_maps_to_email_taken() {
        let mut mock = MockUserRepository::new();
        expect_reader_role(&mut mock);
        mock.expect_username_exists()
            .returning(|_| Box::pin(async move { Ok(false) }));
        mock.expect_create_from_registration()
            .times(1)
            .returning(|_, _| Box::pin(async move { Err(RepositoryError::EmailTaken) }));

        let service = AccountService::new(Arc::new(mock), Arc::new(Argon2PasswordHasher));
        let result = service
            .create_user(&registration(), "Passw0rd!", RoleName::Reader)
            .await;

        assert!(matches!(result, Err(AccountError::EmailTaken)));
    }
}
