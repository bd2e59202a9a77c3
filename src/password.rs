use argon2::{Algorithm, Argon2, Params, Version};
use password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use thiserror::Error;

const SALT_LEN: usize = 16;
// Fixed salt for the unknown-user path only; never stored.
const DUMMY_SALT: &str = "c29tZXNhbHRzb21lc2FsdA";

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("invalid hashing parameters: {0}")]
    Params(String),
    #[error("salt generation failed: {0}")]
    Salt(String),
    #[error("hashing failed: {0}")]
    Hash(String),
}

/// PasswordHasher
///
/// One-way Argon2id transform. Every call draws a fresh random salt and the
/// output is a PHC string (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`) that
/// carries the salt and work factor with it, so nothing else needs storing.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl PasswordHasher {
    /// Builds a hasher with an explicit work factor. Unset values fall back to
    /// the Argon2 defaults.
    pub fn with_cost(
        memory_kib: Option<u32>,
        iterations: Option<u32>,
    ) -> Result<Self, PasswordError> {
        let params = Params::new(
            memory_kib.unwrap_or(Params::DEFAULT_M_COST),
            iterations.unwrap_or(Params::DEFAULT_T_COST),
            Params::DEFAULT_P_COST,
            None,
        )
        .map_err(|e| PasswordError::Params(e.to_string()))?;
        Ok(Self { params })
    }

    pub fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        let mut salt_bytes = [0u8; SALT_LEN];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| PasswordError::Salt(e.to_string()))?;
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Salt(e.to_string()))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let phc = argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?
            .to_string();
        Ok(phc)
    }

    /// Recomputes with the parameters embedded in `hash` and compares in
    /// constant time. A hash that does not parse fails closed.
    pub fn verify(&self, plain: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Spends the work of a real `verify` and always returns false. Used when
    /// the username is unknown so login latency does not reveal whether the
    /// account exists.
    ///
    /// The cost is this hasher's configured work factor. `verify` runs at the
    /// cost embedded in each stored hash, so the two only match for accounts
    /// hashed under the current setting. After `PASSWORD_MEMORY_KIB` or
    /// `PASSWORD_ITERATIONS` changes, older accounts answer at their old
    /// cost until their password is set again.
    pub fn verify_missing(&self, plain: &str) -> bool {
        if let Ok(salt) = SaltString::from_b64(DUMMY_SALT) {
            let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
            let _ = argon2.hash_password(plain.as_bytes(), &salt);
        }
        false
    }

    /// Runs `hash` on the blocking pool so the work factor never stalls the
    /// request executor.
    pub async fn hash_async(&self, plain: String) -> Result<String, PasswordError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(|e| PasswordError::Hash(e.to_string()))?
    }

    pub async fn verify_async(&self, plain: String, hash: String) -> bool {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
            .await
            .unwrap_or(false)
    }

    pub async fn verify_missing_async(&self, plain: String) -> bool {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify_missing(&plain))
            .await
            .unwrap_or(false)
    }
}
