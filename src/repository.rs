use crate::models::{Account, NewAccount, UpdateUserRequest};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;

/// Postgres SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

const ACCOUNT_COLUMNS: &str = "id, username, password_hash, role, name, age, created_at";

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The username is already taken.
    #[error("duplicate account")]
    Duplicate,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository Trait
///
/// The Credential Store contract. Handlers and the `AuthUser` extractor talk
/// to this trait only, so tests swap in an in-memory double without touching
/// them.
///
/// **Send + Sync + async_trait** are required to share the trait object
/// (`Arc<dyn Repository>`) across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credentials ---
    // Lookups on the authentication path surface store failures instead of
    // reporting a missing account.
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError>;
    async fn get_account(&self, id: i64) -> Result<Option<Account>, RepositoryError>;
    // Fails with `Duplicate` when the username exists; the unique constraint
    // decides concurrent registrations.
    async fn create_account(&self, account: NewAccount) -> Result<Account, RepositoryError>;

    // --- User Management ---
    async fn list_accounts(&self) -> Vec<Account>;
    // Partial update; `None` fields keep their stored value.
    async fn update_profile(&self, id: i64, req: UpdateUserRequest) -> Option<Account>;
    // Returns true if a row was removed.
    async fn delete_account(&self, id: i64) -> bool;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the
/// `users` table. Each call checks a connection out of the pool for its own
/// duration only.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("find_by_username error: {:?}", e);
            RepositoryError::Database(e)
        })
    }

    async fn get_account(&self, id: i64) -> Result<Option<Account>, RepositoryError> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("get_account error: {:?}", e);
            RepositoryError::Database(e)
        })
    }

    /// create_account
    ///
    /// Plain INSERT; a unique violation on `username` maps to `Duplicate` so
    /// two racing registrations end with exactly one account.
    async fn create_account(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let result = sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO users (username, password_hash, role, name, age) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(&account.name)
        .bind(account.age)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(created) => Ok(created),
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                Err(RepositoryError::Duplicate)
            }
            Err(e) => {
                tracing::error!("create_account error: {:?}", e);
                Err(RepositoryError::Database(e))
            }
        }
    }

    async fn list_accounts(&self) -> Vec<Account> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM users ORDER BY id");
        match sqlx::query_as::<_, Account>(&query)
            .fetch_all(&self.pool)
            .await
        {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::error!("list_accounts error: {:?}", e);
                vec![]
            }
        }
    }

    /// update_profile
    ///
    /// Uses `COALESCE` so only the fields present in `req` change.
    async fn update_profile(&self, id: i64, req: UpdateUserRequest) -> Option<Account> {
        sqlx::query_as::<_, Account>(&format!(
            "UPDATE users \
             SET name = COALESCE($2, name), \
                 age = COALESCE($3, age) \
             WHERE id = $1 \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .bind(req.name)
        .bind(req.age)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_profile error: {:?}", e);
            None
        })
    }

    async fn delete_account(&self, id: i64) -> bool {
        match sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_account error: {:?}", e);
                false
            }
        }
    }
}
