//! Bearer token issuance and verification (HMAC-signed JWT).
//!
//! Claims are `{sub, iat, exp}`. Expiry is checked here against an explicit
//! clock with zero leeway, so `verify_at(token, exp)` is already `Expired`.

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_ALGORITHM: &str = "HS256";
pub const DEFAULT_TTL_MINUTES: i64 = 30;
/// One year.
pub const MAX_TTL_MINUTES: i64 = 525_600;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,
    #[error("token expired")]
    Expired,
    #[error("{0}")]
    Signing(String),
}

/// Parse an algorithm name, accepting only the HMAC family.
///
/// # Errors
/// Returns an error for unknown names and for asymmetric algorithms.
pub fn parse_algorithm(name: &str) -> Result<Algorithm> {
    match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => bail!("unsupported token algorithm: {other} (expected HS256, HS384 or HS512)"),
    }
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl TokenService {
    /// # Errors
    /// Returns an error if the secret is empty, the algorithm is not HMAC, or
    /// the lifetime is not within `1..=MAX_TTL_MINUTES` minutes.
    pub fn new(secret: &SecretString, algorithm: Algorithm, ttl: Duration) -> Result<Self> {
        let secret = secret.expose_secret();
        if secret.is_empty() {
            bail!("token secret must not be empty");
        }
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            bail!("unsupported token algorithm: {algorithm:?}");
        }
        if ttl <= Duration::zero() {
            bail!("token lifetime must be positive");
        }
        if ttl > Duration::minutes(MAX_TTL_MINUTES) {
            bail!("token lifetime must not exceed {MAX_TTL_MINUTES} minutes");
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            ttl,
        })
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// # Errors
    /// Returns [`TokenError::Signing`] if encoding fails.
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_at(subject, Utc::now())
    }

    /// # Errors
    /// Returns [`TokenError::Signing`] if encoding fails or `now + ttl` is out
    /// of range.
    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Signing("token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|err| TokenError::Signing(err.to_string()))
    }

    /// # Errors
    /// [`TokenError::Invalid`] or [`TokenError::Expired`].
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// # Errors
    /// [`TokenError::Invalid`] for malformed input, a bad signature, a foreign
    /// algorithm or an empty subject; [`TokenError::Expired`] once `now >= exp`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| TokenError::Invalid)?
            .claims;

        if claims.sub.trim().is_empty() {
            return Err(TokenError::Invalid);
        }
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.algorithm)
            .field("ttl_seconds", &self.ttl.num_seconds())
            .field("secret", &"***")
            .finish()
    }
}
