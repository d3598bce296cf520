use blogpress::{
    models::{Registration, RoleName},
    repositories::{
        RegistrationRepository, SqliteRegistrationRepository, SqliteUserRepository,
        UserRepository,
    },
    services::{
        account_service::username_candidates, AccountError, AccountService,
        Argon2PasswordHasher, PasswordHasher,
    },
    test_utils::test_helpers,
};
use sqlx::SqlitePool;
use std::sync::Arc;

struct Fixture {
    pool: SqlitePool,
    registrations: SqliteRegistrationRepository,
    users: Arc<SqliteUserRepository>,
    accounts: AccountService,
}

async fn fixture() -> Fixture {
    let pool = test_helpers::create_test_db().await.unwrap();
    let users = Arc::new(SqliteUserRepository::new(pool.clone()));
    let accounts = AccountService::new(users.clone(), Arc::new(Argon2PasswordHasher));
    Fixture {
        registrations: SqliteRegistrationRepository::new(pool.clone()),
        pool,
        users,
        accounts,
    }
}

async fn verified_registration(
    fixture: &Fixture,
    email: &str,
    first: &str,
    last: &str,
) -> Registration {
    let mut registration =
        Registration::new(email.to_string(), first.to_string(), last.to_string());
    registration.mark_email_verified();
    fixture.registrations.create(&registration).await.unwrap();
    registration
}

#[tokio::test]
async fn test_local_part_is_preferred_username() {
    let fixture = fixture().await;
    let registration =
        verified_registration(&fixture, "jane.doe@example.com", "Jane", "Doe").await;

    let user = fixture
        .accounts
        .create_user(&registration, "Passw0rd!", RoleName::Reader)
        .await
        .unwrap();

    assert_eq!(user.username, "jane.doe");
    assert_eq!(user.email, "jane.doe@example.com");
    assert!(Argon2PasswordHasher.verify("Passw0rd!", &user.password_hash));
}

#[tokio::test]
async fn test_taken_local_part_falls_back_to_full_name() {
    let fixture = fixture().await;
    test_helpers::insert_test_user(
        &fixture.pool,
        "jane.doe",
        "other@example.com",
        "password123",
        RoleName::Reader,
    )
    .await
    .unwrap();
    let registration =
        verified_registration(&fixture, "jane.doe@example.com", "Jane", "Doe").await;

    let user = fixture
        .accounts
        .create_user(&registration, "Passw0rd!", RoleName::Reader)
        .await
        .unwrap();

    assert_eq!(user.username, "Jane-Doe");
}

#[tokio::test]
async fn test_numeric_suffix_when_name_also_taken() {
    let fixture = fixture().await;
    for (username, email) in [
        ("jane.doe", "one@example.com"),
        ("Jane-Doe", "two@example.com"),
        ("Jane-Doe1", "three@example.com"),
    ] {
        test_helpers::insert_test_user(
            &fixture.pool,
            username,
            email,
            "password123",
            RoleName::Reader,
        )
        .await
        .unwrap();
    }
    let registration =
        verified_registration(&fixture, "jane.doe@example.com", "Jane", "Doe").await;

    let user = fixture
        .accounts
        .create_user(&registration, "Passw0rd!", RoleName::Reader)
        .await
        .unwrap();

    assert_eq!(user.username, "Jane-Doe2");
}

#[tokio::test]
async fn test_user_insert_and_registration_delete_are_atomic() {
    let fixture = fixture().await;
    let registration =
        verified_registration(&fixture, "atomic@example.com", "Ada", "Lovelace").await;

    fixture
        .accounts
        .create_user(&registration, "Passw0rd!", RoleName::Reader)
        .await
        .unwrap();
    assert!(fixture
        .registrations
        .find_by_id(&registration.audit.id)
        .await
        .unwrap()
        .is_none());

    // A second materialization of the same registration must leave no user behind.
    let again = Registration {
        email: "atomic2@example.com".to_string(),
        ..registration.clone()
    };
    let result = fixture
        .accounts
        .create_user(&again, "Passw0rd!", RoleName::Reader)
        .await;

    assert!(matches!(result, Err(AccountError::RegistrationNotFound)));
    assert!(fixture
        .users
        .find_by_email("atomic2@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_existing_email_is_a_conflict() {
    let fixture = fixture().await;
    let registration =
        verified_registration(&fixture, "taken@example.com", "Ada", "Lovelace").await;
    test_helpers::insert_test_user(
        &fixture.pool,
        "someone",
        "taken@example.com",
        "password123",
        RoleName::Reader,
    )
    .await
    .unwrap();

    let result = fixture
        .accounts
        .create_user(&registration, "Passw0rd!", RoleName::Reader)
        .await;

    assert!(matches!(result, Err(AccountError::EmailTaken)));
    assert!(fixture
        .registrations
        .find_by_id(&registration.audit.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_admin_role_is_resolved_from_catalog() {
    let fixture = fixture().await;
    let registration =
        verified_registration(&fixture, "root@example.com", "Ada", "Lovelace").await;

    let user = fixture
        .accounts
        .create_user(&registration, "Passw0rd!", RoleName::Admin)
        .await
        .unwrap();

    let admin = fixture
        .users
        .find_role_by_name(RoleName::Admin)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.role_id, admin.audit.id);
}

#[tokio::test]
async fn test_missing_role_seed_is_reported() {
    let fixture = fixture().await;
    sqlx::query("DELETE FROM roles WHERE name = 'ROLE_ADMIN'")
        .execute(&fixture.pool)
        .await
        .unwrap();
    let registration =
        verified_registration(&fixture, "root@example.com", "Ada", "Lovelace").await;

    let result = fixture
        .accounts
        .create_user(&registration, "Passw0rd!", RoleName::Admin)
        .await;

    assert!(matches!(result, Err(AccountError::RoleNotFound(RoleName::Admin))));
}

#[test]
fn test_long_local_part_is_skipped() {
    let local = "x".repeat(51);
    let email = format!("{local}@example.com");
    let first = username_candidates(&email, "Jane", "Doe").next().unwrap();
    assert_eq!(first, "Jane-Doe");
}

#[test]
fn test_suffixed_candidates_fit_the_limit() {
    let first = "é".repeat(40);
    let last = "ü".repeat(40);
    let candidates: Vec<String> = username_candidates("a@b.c", &first, &last).collect();

    assert_eq!(candidates[0], "a");
    assert_eq!(candidates[1].chars().count(), 50);
    assert!(candidates[2].ends_with('1'));
    assert_eq!(candidates.last().unwrap().chars().count(), 50);
    assert!(candidates.last().unwrap().ends_with("999"));
    assert!(candidates.iter().all(|c| c.chars().count() <= 50));
}
