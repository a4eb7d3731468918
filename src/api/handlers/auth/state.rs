use super::{password::PasswordHasher, token::TokenService};
use anyhow::{bail, Context, Result};
use chrono::Duration;
use jsonwebtoken::Algorithm;
use rand::{distributions::Alphanumeric, Rng};
use secrecy::SecretString;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use super::{
    password::DEFAULT_COST,
    token::{DEFAULT_TTL_MINUTES, MAX_TTL_MINUTES},
};

/// Startup configuration for the auth subsystem.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    secret: SecretString,
    algorithm: Algorithm,
    token_ttl_minutes: i64,
    bcrypt_cost: u32,
}

impl AuthConfig {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            algorithm: Algorithm::HS256,
            token_ttl_minutes: DEFAULT_TTL_MINUTES,
            bcrypt_cost: DEFAULT_COST,
        }
    }

    #[must_use]
    pub const fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    #[must_use]
    pub const fn with_token_ttl_minutes(mut self, minutes: i64) -> Self {
        self.token_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub const fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    #[must_use]
    pub const fn token_ttl_minutes(&self) -> i64 {
        self.token_ttl_minutes
    }

    #[must_use]
    pub const fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }
}

/// Immutable auth collaborators shared by every request.
#[derive(Clone, Debug)]
pub struct AuthState {
    tokens: TokenService,
    passwords: PasswordHasher,
    // hash of a random password at the configured cost
    decoy_hash: Arc<str>,
    decoy_checks: Arc<AtomicU64>,
}

impl AuthState {
    /// # Errors
    /// Returns an error if the token lifetime is out of range or the token
    /// service rejects the configuration.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        if !(1..=MAX_TTL_MINUTES).contains(&config.token_ttl_minutes) {
            bail!(
                "token lifetime must be between 1 and {MAX_TTL_MINUTES} minutes, got {}",
                config.token_ttl_minutes
            );
        }
        let tokens = TokenService::new(
            &config.secret,
            config.algorithm,
            Duration::minutes(config.token_ttl_minutes),
        )?;

        let passwords = PasswordHasher::new(config.bcrypt_cost);
        let decoy: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let decoy_hash = passwords
            .hash(&decoy)
            .context("failed to prepare login decoy hash")?;

        Ok(Self {
            tokens,
            passwords,
            decoy_hash: Arc::from(decoy_hash),
            decoy_checks: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Verify `password` against `hash`. Without a hash the same bcrypt work is
    /// spent on the decoy hash and the result is always `false`, so a missing
    /// account costs as much time as a wrong password.
    pub async fn verify_password(&self, password: &str, hash: Option<String>) -> bool {
        match hash {
            Some(hash) => self.passwords.spawn_verify(password.to_string(), hash).await,
            None => {
                self.decoy_checks.fetch_add(1, Ordering::Relaxed);
                let _ = self
                    .passwords
                    .spawn_verify(password.to_string(), self.decoy_hash.to_string())
                    .await;
                false
            }
        }
    }

    /// Number of password checks answered with the decoy hash.
    #[must_use]
    pub fn decoy_checks(&self) -> u64 {
        self.decoy_checks.load(Ordering::Relaxed)
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[must_use]
    pub const fn passwords(&self) -> PasswordHasher {
        self.passwords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_service_constants() {
        let config = AuthConfig::new(SecretString::from("secret"));
        assert_eq!(config.token_ttl_minutes(), 30);
        assert_eq!(config.bcrypt_cost(), DEFAULT_COST);
    }

    #[test]
    fn builder_overrides() -> Result<()> {
        let config = AuthConfig::new(SecretString::from("secret"))
            .with_algorithm(Algorithm::HS512)
            .with_token_ttl_minutes(5)
            .with_bcrypt_cost(4);
        let state = AuthState::new(&config)?;
        assert_eq!(state.tokens().algorithm(), Algorithm::HS512);
        assert_eq!(state.tokens().ttl(), Duration::minutes(5));
        assert_eq!(state.passwords().cost(), 4);
        Ok(())
    }

    #[test]
    fn out_of_range_lifetime_is_rejected() {
        for minutes in [0, MAX_TTL_MINUTES + 1, 1_000_000_000_000, i64::MAX] {
            let config = AuthConfig::new(SecretString::from("secret")).with_token_ttl_minutes(minutes);
            assert!(AuthState::new(&config).is_err(), "{minutes} minutes");
        }
        let config = AuthConfig::new(SecretString::from("secret")).with_token_ttl_minutes(MAX_TTL_MINUTES);
        assert!(AuthState::new(&config).is_ok());
    }

    #[tokio::test]
    async fn decoy_verification_never_matches() -> Result<()> {
        let state = AuthState::new(&AuthConfig::new(SecretString::from("secret")).with_bcrypt_cost(4))?;
        assert!(state.decoy_hash.starts_with("$2b$04$"));

        assert!(!state.verify_password("", None).await);
        assert!(!state.verify_password("anything", None).await);
        assert_eq!(state.decoy_checks(), 2);

        let hash = state.passwords().hash("pw")?;
        assert!(state.verify_password("pw", Some(hash.clone())).await);
        assert!(!state.verify_password("nope", Some(hash)).await);
        assert_eq!(state.decoy_checks(), 2);
        Ok(())
    }

    #[test]
    fn empty_secret_is_rejected() {
        let config = AuthConfig::new(SecretString::from(""));
        assert!(AuthState::new(&config).is_err());
    }
}
