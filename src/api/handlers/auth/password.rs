//! bcrypt password hashing.
//!
//! bcrypt only looks at the first 72 bytes of its input. The truncation is done
//! explicitly here so hashing and verification always agree on which bytes
//! count, independent of the library version.

use crate::api::error::ApiError;
use tokio::task;

pub const MAX_PASSWORD_BYTES: usize = 72;
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;
pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

fn truncated(password: &str) -> &[u8] {
    let bytes = password.as_bytes();
    &bytes[..bytes.len().min(MAX_PASSWORD_BYTES)]
}

#[derive(Clone, Copy, Debug)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    /// Cost is clamped into bcrypt's accepted range.
    #[must_use]
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_COST, MAX_COST),
        }
    }

    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash with a fresh random salt.
    ///
    /// # Errors
    /// Returns the bcrypt error if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, bcrypt::BcryptError> {
        bcrypt::hash(truncated(password), self.cost)
    }

    /// Malformed or foreign hashes verify as `false`.
    #[must_use]
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        bcrypt::verify(truncated(password), hash).unwrap_or(false)
    }

    /// [`Self::hash`] on the blocking pool.
    ///
    /// # Errors
    /// Returns [`ApiError::Internal`] if hashing fails or the task is cancelled.
    pub async fn spawn_hash(self, password: String) -> Result<String, ApiError> {
        task::spawn_blocking(move || self.hash(&password))
            .await
            .map_err(|err| ApiError::Internal(format!("password hashing task failed: {err}")))?
            .map_err(|err| ApiError::Internal(format!("password hashing failed: {err}")))
    }

    /// [`Self::verify`] on the blocking pool. A cancelled task counts as a mismatch.
    pub async fn spawn_verify(self, password: String, hash: String) -> bool {
        task::spawn_blocking(move || self.verify(&password, &hash))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(MIN_COST)
    }

    #[test]
    fn verify_accepts_matching_password() -> Result<()> {
        let hash = hasher().hash("correct horse")?;
        assert!(hash.starts_with("$2"));
        assert!(hasher().verify("correct horse", &hash));
        assert!(!hasher().verify("battery staple", &hash));
        Ok(())
    }

    #[test]
    fn salts_differ_per_call() -> Result<()> {
        let first = hasher().hash("same")?;
        let second = hasher().hash("same")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn only_first_72_bytes_count() -> Result<()> {
        let prefix = "a".repeat(MAX_PASSWORD_BYTES);
        let long_one = format!("{prefix}one");
        let long_two = format!("{prefix}two");

        let hash = hasher().hash(&long_one)?;
        assert!(hasher().verify(&long_two, &hash));
        assert!(hasher().verify(&prefix, &hash));

        let prefix_hash = hasher().hash(&prefix)?;
        assert!(hasher().verify(&long_one, &prefix_hash));
        Ok(())
    }

    #[test]
    fn truncation_counts_bytes_not_chars() {
        // 3 bytes per char: 25 chars = 75 bytes
        let password = "바".repeat(25);
        assert_eq!(truncated(&password).len(), MAX_PASSWORD_BYTES);
        assert_eq!(truncated("short").len(), 5);
    }

    #[test]
    fn malformed_hash_is_rejected_quietly() {
        assert!(!hasher().verify("anything", "not-a-bcrypt-hash"));
        assert!(!hasher().verify("anything", ""));
    }

    #[test]
    fn cost_is_clamped() {
        assert_eq!(PasswordHasher::new(1).cost(), MIN_COST);
        assert_eq!(PasswordHasher::new(99).cost(), MAX_COST);
        assert_eq!(PasswordHasher::default().cost(), DEFAULT_COST);
    }

    #[tokio::test]
    async fn background_hash_and_verify() -> Result<()> {
        let hash = hasher().spawn_hash("pw".to_string()).await?;
        assert!(hasher().spawn_verify("pw".to_string(), hash.clone()).await);
        assert!(!hasher().spawn_verify("nope".to_string(), hash).await);
        Ok(())
    }
}
