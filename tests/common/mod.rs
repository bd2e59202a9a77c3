#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use user_portal::{
    AppState, MockStorageService, PasswordHasher, TokenService,
    config::AppConfig,
    models::{Account, NewAccount, Role, UpdateUserRequest},
    repository::{Repository, RepositoryError, RepositoryState},
    token::ExtraClaims,
};

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

// --- In-Memory Repository ---

/// Test double for the Credential Store. Mirrors the Postgres behavior that
/// matters to callers: sequential ids and a unique username.
#[derive(Default)]
pub struct InMemoryRepo {
    accounts: Mutex<Vec<Account>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an account directly with a precomputed hash.
    pub fn seed(&self, username: &str, password_hash: &str, role: Role) -> Account {
        let mut accounts = self.accounts.lock().unwrap();
        let account = Account {
            id: accounts.iter().map(|a| a.id).max().unwrap_or(0) + 1,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role,
            name: format!("{username} name"),
            age: 30,
            created_at: Utc::now(),
        };
        accounts.push(account.clone());
        account
    }

    pub fn len(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }
}

#[async_trait]
impl Repository for InMemoryRepo {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn get_account(&self, id: i64) -> Result<Option<Account>, RepositoryError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.iter().any(|a| a.username == account.username) {
            return Err(RepositoryError::Duplicate);
        }
        let created = Account {
            id: accounts.iter().map(|a| a.id).max().unwrap_or(0) + 1,
            username: account.username,
            password_hash: account.password_hash,
            role: account.role,
            name: account.name,
            age: account.age,
            created_at: Utc::now(),
        };
        accounts.push(created.clone());
        Ok(created)
    }

    async fn list_accounts(&self) -> Vec<Account> {
        self.accounts.lock().unwrap().clone()
    }

    async fn update_profile(&self, id: i64, req: UpdateUserRequest) -> Option<Account> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.iter_mut().find(|a| a.id == id)?;
        if let Some(name) = req.name {
            account.name = name;
        }
        if let Some(age) = req.age {
            account.age = age;
        }
        Some(account.clone())
    }

    async fn delete_account(&self, id: i64) -> bool {
        let mut accounts = self.accounts.lock().unwrap();
        let before = accounts.len();
        accounts.retain(|a| a.id != id);
        accounts.len() != before
    }
}

// --- Unavailable Store ---

/// A Credential Store whose every call fails as if Postgres were down.
pub struct UnavailableRepo;

fn pool_timeout() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl Repository for UnavailableRepo {
    async fn find_by_username(&self, _username: &str) -> Result<Option<Account>, RepositoryError> {
        Err(pool_timeout())
    }

    async fn get_account(&self, _id: i64) -> Result<Option<Account>, RepositoryError> {
        Err(pool_timeout())
    }

    async fn create_account(&self, _account: NewAccount) -> Result<Account, RepositoryError> {
        Err(pool_timeout())
    }

    async fn list_accounts(&self) -> Vec<Account> {
        vec![]
    }

    async fn update_profile(&self, _id: i64, _req: UpdateUserRequest) -> Option<Account> {
        None
    }

    async fn delete_account(&self, _id: i64) -> bool {
        false
    }
}

// --- State Helpers ---

pub fn cheap_hasher() -> PasswordHasher {
    PasswordHasher::with_cost(Some(1024), Some(1)).unwrap()
}

pub fn test_state(repo: Arc<InMemoryRepo>, storage: MockStorageService) -> AppState {
    state_with_repo(repo, storage)
}

pub fn state_with_repo(repo: RepositoryState, storage: MockStorageService) -> AppState {
    let mut config = AppConfig::default();
    config.jwt_secret = TEST_JWT_SECRET.to_string();

    AppState {
        repo,
        storage: Arc::new(storage),
        config,
        tokens: Arc::new(TokenService::new(TEST_JWT_SECRET)),
        hasher: cheap_hasher(),
    }
}

/// A token for `account` that is valid right now.
pub fn token_for(account: &Account) -> String {
    TokenService::new(TEST_JWT_SECRET)
        .issue_now(
            account.id,
            ExtraClaims {
                username: Some(account.username.clone()),
                role: Some(account.role),
            },
        )
        .unwrap()
}
