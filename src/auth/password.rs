// Password hashing with bcrypt.
//
// bcrypt is deliberately slow, so both directions run on the blocking pool
// to keep the async runtime free for other requests.

use anyhow::{Context, Result};

/// bcrypt with a configurable work factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl PasswordHasher {
    /// `cost` must be within bcrypt's 4..=31 range.
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Salted one-way hash of `password`.
    pub async fn hash(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .context("Password hashing task failed")?
            .context("Password hashing failed")
    }

    /// True when `password` matches `hash`. A malformed hash counts as a mismatch.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        let matched = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .context("Password verification task failed")?;
        Ok(matched.unwrap_or(false))
    }
}
