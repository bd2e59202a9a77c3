use sqlx::PgPool;
use tokio::test;
use user_portal::{
    models::{NewAccount, Role, UpdateUserRequest},
    repository::{PostgresRepository, Repository, RepositoryError},
};

// These tests need a running Postgres. Run with:
//   DATABASE_URL=postgres://... cargo test -- --ignored

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// A username no other test run has used.
fn unique_username(prefix: &str) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{prefix}_{nanos}")
}

fn new_account(username: &str, role: Role) -> NewAccount {
    NewAccount {
        username: username.to_string(),
        password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdA$aGFzaA".to_string(),
        role,
        name: "Integration".to_string(),
        age: 33,
    }
}

// --- Tests ---

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_and_find_account() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let username = unique_username("alice");

    let created = repo
        .create_account(new_account(&username, Role::Admin))
        .await
        .unwrap();
    assert_eq!(created.username, username);
    assert_eq!(created.role, Role::Admin);

    let by_name = repo.find_by_username(&username).await.unwrap().unwrap();
    assert_eq!(by_name.id, created.id);
    assert_eq!(by_name.password_hash, created.password_hash);

    let by_id = repo.get_account(created.id).await.unwrap().unwrap();
    assert_eq!(by_id.username, username);

    repo.delete_account(created.id).await;
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_username_rejected() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let username = unique_username("dup");

    let first = repo
        .create_account(new_account(&username, Role::User))
        .await
        .unwrap();
    let second = repo.create_account(new_account(&username, Role::User)).await;

    assert!(matches!(second, Err(RepositoryError::Duplicate)));

    repo.delete_account(first.id).await;
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_registrations_yield_one_account() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let username = unique_username("race");

    let (a, b) = tokio::join!(
        repo.create_account(new_account(&username, Role::User)),
        repo.create_account(new_account(&username, Role::User)),
    );

    let successes: Vec<_> = [a, b].into_iter().filter_map(Result::ok).collect();
    assert_eq!(successes.len(), 1);

    repo.delete_account(successes[0].id).await;
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_update_profile_is_partial() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let created = repo
        .create_account(new_account(&unique_username("upd"), Role::User))
        .await
        .unwrap();

    let updated = repo
        .update_profile(
            created.id,
            UpdateUserRequest {
                name: Some("Renamed".to_string()),
                age: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.age, created.age);

    repo.delete_account(created.id).await;
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_and_missing_rows() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let created = repo
        .create_account(new_account(&unique_username("del"), Role::User))
        .await
        .unwrap();

    assert!(repo.delete_account(created.id).await);
    assert!(!repo.delete_account(created.id).await);
    assert!(repo.get_account(created.id).await.unwrap().is_none());
    assert!(
        repo.update_profile(created.id, UpdateUserRequest::default())
            .await
            .is_none()
    );
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_list_accounts_includes_created() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let created = repo
        .create_account(new_account(&unique_username("list"), Role::User))
        .await
        .unwrap();

    let all = repo.list_accounts().await;
    assert!(all.iter().any(|a| a.id == created.id));

    repo.delete_account(created.id).await;
}
